pub const DEFAULT_RESOURCE: &str = "https://roadmap.sh/";

const MAX_RESOURCES: usize = 3;

/// Topic to learning-resource lookup used when building a roadmap.
pub trait ResourceLookup: Send + Sync {
    /// Up to three URLs for `topic`, most relevant first. Never empty.
    fn resources(&self, topic: &str) -> Vec<String>;
}

/// Keyword table matched against the lowercased topic. First hit wins.
const DOCS_BY_KEYWORD: &[(&str, &str)] = &[
    ("python", "https://docs.python.org/3/tutorial/"),
    ("django", "https://docs.djangoproject.com/en/stable/"),
    ("flask", "https://flask.palletsprojects.com/"),
    ("fastapi", "https://fastapi.tiangolo.com/"),
    ("sql", "https://www.w3schools.com/sql/"),
    ("postgresql", "https://www.postgresql.org/docs/"),
    ("mysql", "https://dev.mysql.com/doc/"),
    ("git", "https://git-scm.com/book/en/v2"),
    ("docker", "https://docs.docker.com/get-started/"),
    ("kubernetes", "https://kubernetes.io/docs/home/"),
    ("javascript", "https://javascript.info/"),
    ("typescript", "https://www.typescriptlang.org/docs/"),
    ("react", "https://react.dev/learn"),
    ("vue", "https://vuejs.org/guide/"),
    ("linux", "https://linuxjourney.com/"),
    ("rest", "https://restfulapi.net/"),
    ("api", "https://restfulapi.net/"),
    ("oop", "https://realpython.com/python3-object-oriented-programming/"),
    ("ооп", "https://realpython.com/python3-object-oriented-programming/"),
    ("алгоритмы", "https://leetcode.com/"),
    ("algorithms", "https://leetcode.com/"),
    ("тестирование", "https://docs.pytest.org/"),
    ("testing", "https://docs.pytest.org/"),
    ("pytest", "https://docs.pytest.org/"),
    ("asyncio", "https://docs.python.org/3/library/asyncio.html"),
    ("async", "https://docs.python.org/3/library/asyncio.html"),
    ("база данных", "https://www.w3schools.com/sql/"),
    ("базы данных", "https://www.w3schools.com/sql/"),
    ("database", "https://www.w3schools.com/sql/"),
    ("архитектур", "https://refactoring.guru/design-patterns"),
    ("architecture", "https://refactoring.guru/design-patterns"),
    ("паттерн", "https://refactoring.guru/design-patterns"),
    ("pattern", "https://refactoring.guru/design-patterns"),
    ("solid", "https://refactoring.guru/design-patterns"),
    ("проектирован", "https://refactoring.guru/design-patterns"),
    ("uml", "https://www.visual-paradigm.com/guide/uml-unified-modeling-language/"),
    ("диаграмм", "https://www.visual-paradigm.com/guide/uml-unified-modeling-language/"),
    ("redis", "https://redis.io/docs/"),
    ("celery", "https://docs.celeryq.dev/"),
    ("jwt", "https://jwt.io/introduction"),
    ("auth", "https://jwt.io/introduction"),
    ("orm", "https://docs.sqlalchemy.org/"),
    ("sqlalchemy", "https://docs.sqlalchemy.org/"),
    ("индекс", "https://use-the-index-luke.com/"),
    ("index", "https://use-the-index-luke.com/"),
    ("оптимизац", "https://use-the-index-luke.com/"),
    ("optimi", "https://use-the-index-luke.com/"),
    ("kafka", "https://kafka.apache.org/documentation/"),
    ("rabbitmq", "https://www.rabbitmq.com/tutorials"),
    ("очеред", "https://www.rabbitmq.com/tutorials"),
    ("queue", "https://www.rabbitmq.com/tutorials"),
    ("ci/cd", "https://docs.github.com/en/actions"),
    ("ci cd", "https://docs.github.com/en/actions"),
    ("nginx", "https://nginx.org/en/docs/"),
    ("http", "https://developer.mozilla.org/en-US/docs/Web/HTTP"),
];

/// Secondary links appended after the primary match.
const EXTRA_BY_KEYWORD: &[(&[&str], &str)] = &[
    (&["python", "django"], "https://realpython.com/"),
    (&["sql", "база", "database"], "https://sqlbolt.com/"),
    (&["git"], "https://learngitbranching.js.org/"),
];

/// The built-in keyword table.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResources;

impl KeywordResources {
    fn primary(topic: &str) -> &'static str {
        DOCS_BY_KEYWORD
            .iter()
            .find(|(keyword, _)| topic.contains(keyword))
            .map_or(DEFAULT_RESOURCE, |(_, url)| *url)
    }
}

impl ResourceLookup for KeywordResources {
    fn resources(&self, topic: &str) -> Vec<String> {
        let topic = topic.to_lowercase();
        let mut urls = vec![Self::primary(&topic).to_string()];
        for (keywords, url) in EXTRA_BY_KEYWORD {
            if keywords.iter().any(|k| topic.contains(k)) && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        urls.truncate(MAX_RESOURCES);
        urls
    }
}
