use mockview_schema::AnswerQuality;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// Streak-based difficulty state machine.
///
/// Two strong answers in a row raise the level by one. A single weak answer
/// lowers it by one immediately. Anything else resets both streaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyController {
    level: u8,
    good_streak: u32,
    bad_streak: u32,
    history: Vec<AnswerQuality>,
}

impl DifficultyController {
    pub fn new(initial: u8) -> Self {
        Self {
            level: initial.clamp(MIN_LEVEL, MAX_LEVEL),
            good_streak: 0,
            bad_streak: 0,
            history: Vec::new(),
        }
    }

    /// Starting level for a target grade.
    pub fn for_grade(grade: &str) -> Self {
        let initial = match grade.trim().to_lowercase().as_str() {
            "junior" => 2,
            "middle" => 3,
            "senior" => 4,
            "lead" => 5,
            _ => 2,
        };
        Self::new(initial)
    }

    pub fn update(&mut self, quality: AnswerQuality) -> u8 {
        self.history.push(quality);

        if quality.is_strong() {
            self.good_streak += 1;
            self.bad_streak = 0;
            if self.good_streak >= 2 {
                self.level = (self.level + 1).min(MAX_LEVEL);
                self.good_streak = 0;
            }
        } else if quality.is_weak() {
            self.bad_streak += 1;
            self.good_streak = 0;
            self.level = self.level.saturating_sub(1).max(MIN_LEVEL);
            if self.level == MIN_LEVEL {
                self.bad_streak = 0;
            }
        } else {
            self.good_streak = 0;
            self.bad_streak = 0;
        }

        self.level
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn good_streak(&self) -> u32 {
        self.good_streak
    }

    pub fn bad_streak(&self) -> u32 {
        self.bad_streak
    }

    pub fn history(&self) -> &[AnswerQuality] {
        &self.history
    }
}

impl Default for DifficultyController {
    fn default() -> Self {
        Self::new(2)
    }
}
