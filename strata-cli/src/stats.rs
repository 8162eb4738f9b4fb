use clap::Args;
use strata_configuration::Config;
use strata_core::{Hash, KeyOptions};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Name of the stats hash.
    pub name: Option<String>,
    /// Bucket to read. Defaults to the configured default bucket.
    #[arg(long, short)]
    pub bucket: Option<String>,
}

impl StatsArgs {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let Some(name) = self.name.as_deref() else {
            eprintln!("missing parameter <name>");
            return Ok(());
        };

        let stats = config.stats(config.key_value_store()?);
        let mut options = KeyOptions::new();
        if let Some(bucket) = &self.bucket {
            options = options.prefix(bucket.as_str());
        }
        let fields = stats.fields(name, &options).await?;
        print!("{}", render(&fields));
        Ok(())
    }
}

/// One `field: value` line per counter, fields right-aligned on the longest name.
pub fn render(fields: &Hash) -> String {
    let width = fields.keys().map(|field| field.chars().count()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(field, value)| format!("{field:>width$}: {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_aligns_on_longest_field() {
        let fields: Hash = [("ok", "12"), ("failed", "3"), ("a", "0.5")]
            .into_iter()
            .map(|(field, value)| (field.to_owned(), value.to_owned()))
            .collect();
        assert_eq!(render(&fields), "    ok: 12\nfailed: 3\n     a: 0.5\n");
    }

    #[test]
    fn render_empty_hash_prints_nothing() {
        assert_eq!(render(&Hash::new()), "");
    }

    #[tokio::test]
    async fn missing_name_is_not_an_error() {
        let args = StatsArgs { name: None, bucket: None };
        assert!(args.run(&Config::default()).await.is_ok());
    }

    #[tokio::test]
    async fn reads_counters_from_the_configured_store() {
        let config = Config::from_yaml("store:\n  type: Memory\nmiddleware:\n  tracing: false\n")
            .unwrap();
        let kv = config.key_value_store().unwrap();
        let stats = config.stats(kv);
        stats
            .inc("requests", "ok", "user:1", &KeyOptions::new())
            .await
            .unwrap();

        let fields = stats
            .fields("requests", &KeyOptions::new().prefix("user:1"))
            .await
            .unwrap();
        assert_eq!(render(&fields), "ok: 1\n");
        assert!(stats.fields("requests", &KeyOptions::new()).await.unwrap().is_empty());
    }
}
