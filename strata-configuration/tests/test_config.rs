use pretty_assertions::assert_eq;
use strata_configuration::{
    Config, ConfigError, Keys, Store,
    store::{Memory, Redis},
};
use strata_core::{Expiry, KeyOptions};

#[test]
fn test_empty_document_takes_defaults() {
    let config = Config::from_yaml("{}").expect("failed to deserialize");

    assert_eq!(config.keys, Keys::default());
    assert_eq!(config.keys.format, "{:environment}:{:key}");
    assert_eq!(config.keys.separator, ":");
    assert_eq!(config.expiry, None);
    assert_eq!(config.leaderboard.namespace, "leaderboards");
    assert_eq!(config.leaderboard.page_size, 100);
    assert_eq!(config.stats.namespace, "stats");
    assert_eq!(config.stats.default_bucket, "global");
    assert_eq!(config.lists.namespace, "lists");
    assert!(config.middleware.tracing);
    assert!(!config.middleware.metrics);
    assert_eq!(config.store, Store::Redis(Redis::default()));
}

#[test]
fn test_full_document() {
    let yaml = r#"
environment: production
keys:
  format: "{:app}.{:environment}.{:key}"
  separator: "."
  replacements:
    "{:app}": shop
expiry: 3600
leaderboard:
  namespace: boards
  page_size: 25
stats:
  namespace: counters
  default_bucket: all
lists:
  namespace: queues
middleware:
  tracing: false
store:
  type: Redis
  connection_string: "redis://localhost:6379/1"
  connect_retries: 5
  label: primary
"#;

    let config = Config::from_yaml(yaml).expect("failed to deserialize");

    assert_eq!(config.environment(), "production");
    assert_eq!(config.keys.replacements["{:app}"], "shop");
    assert_eq!(config.expiry(), Some(Expiry::In(std::time::Duration::from_secs(3600))));
    assert_eq!(config.leaderboard.page_size, 25);
    assert_eq!(config.stats.default_bucket, "all");
    assert_eq!(config.lists.namespace, "queues");
    assert!(!config.middleware.tracing);
    assert_eq!(
        config.store,
        Store::Redis(Redis {
            connection_string: "redis://localhost:6379/1".to_owned(),
            connect_retries: 5,
            label: Some("primary".to_owned()),
        })
    );

    let resolver = config.resolver();
    assert_eq!(
        resolver.resolve_key("foo", &KeyOptions::new().namespace("ns")),
        "shop.production.ns.foo"
    );
}

#[test]
fn test_redis_connect_retries_default() {
    let yaml = r#"
store:
  type: Redis
  connection_string: "redis://localhost:6379"
"#;

    let config = Config::from_yaml(yaml).expect("failed to deserialize");
    match config.store {
        Store::Redis(redis) => {
            assert_eq!(redis.connect_retries, 3);
            assert_eq!(redis.label, None);
        }
        _ => panic!("expected Redis store"),
    }
}

#[test]
fn test_memory_store_deserialize() {
    let yaml = r#"
store:
  type: Memory
  label: cache
"#;

    let config = Config::from_yaml(yaml).expect("failed to deserialize");
    assert_eq!(
        config.store,
        Store::Memory(Memory {
            label: Some("cache".to_owned())
        })
    );
}

#[test]
fn test_round_trip() {
    let config = Config::from_yaml("environment: test\nstore:\n  type: Memory\n").unwrap();
    let yaml = serde_saphyr::to_string(&config).expect("failed to serialize");
    let parsed = Config::from_yaml(&yaml).expect("failed to deserialize");
    assert_eq!(config, parsed);
}

#[test]
fn test_unknown_store_type_is_a_parse_error() {
    let result = Config::from_yaml("store:\n  type: Tarantool\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let result = Config::from_file("/nonexistent/strata.yaml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[cfg(not(feature = "redis"))]
#[test]
fn test_redis_store_needs_feature() {
    let config = Config::from_yaml("{}").unwrap();
    assert!(matches!(
        config.key_value_store(),
        Err(ConfigError::StoreNotAvailable(_))
    ));
}

#[cfg(all(feature = "memory", not(feature = "metrics")))]
#[test]
fn test_metrics_middleware_needs_feature() {
    let config =
        Config::from_yaml("store:\n  type: Memory\nmiddleware:\n  metrics: true\n").unwrap();
    assert!(matches!(
        config.key_value_store(),
        Err(ConfigError::FeatureNotEnabled("metrics"))
    ));
}

#[cfg(feature = "memory")]
mod memory {
    use pretty_assertions::assert_eq;
    use strata_backend::LeaderOptions;
    use strata_configuration::Config;
    use strata_core::{Buckets, FieldValue, KeyOptions};

    const YAML: &str = r#"
environment: test
keys:
  format: "app:{:environment}:{:key}"
leaderboard:
  page_size: 2
stats:
  default_bucket: everything
store:
  type: Memory
"#;

    #[tokio::test]
    async fn test_builds_working_facades() {
        let config = Config::from_yaml(YAML).unwrap();
        let kv = config.key_value_store().unwrap();
        assert_eq!(kv.middlewares().len(), 1);
        assert_eq!(kv.store().label().as_str(), "memory");

        kv.write("foo", "bar", &KeyOptions::new()).await.unwrap();
        assert_eq!(
            kv.store().get("app:test:foo").await.unwrap().as_deref(),
            Some("bar")
        );

        let board = config.leaderboard("scores", &kv);
        assert_eq!(board.page_size(), 2);
        for (member, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            board.add_member(member, score).await.unwrap();
        }
        assert_eq!(board.total_pages().await.unwrap(), 2);
        let top = board
            .leaders(1, LeaderOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top[0].member, "c");

        let stats = config.stats(kv.clone());
        let counters = stats
            .inc("hits", "ok", Buckets::new(), &KeyOptions::new())
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(counters.get("ok"), Some(&FieldValue::Int(1)));
        assert_eq!(
            kv.store()
                .hget("app:test:stats:everything:hits", "ok")
                .await
                .unwrap()
                .as_deref(),
            Some("1")
        );

        let lists = config.lists(kv);
        lists
            .add("queue", ["x"], Buckets::new(), &KeyOptions::new())
            .await
            .unwrap();
        assert_eq!(
            lists.kv().store().llen("app:test:lists:queue").await.unwrap(),
            1
        );
    }
}
