pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{LogConfig, PoolConfig};

pub fn load_config(path: &str) -> Result<PoolConfig> {
    let raw_content = std::fs::read_to_string(Path::new(path))?;
    let content = expand_env_vars(&raw_content);
    let config: PoolConfig = serde_yml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// 展开 `${VAR}` 与 `${VAR:-default}`，未定义且无默认值的变量替换为空
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let (name, default) = match body[..end].split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (&body[..end], None),
        };
        match (std::env::var(name), default) {
            (Ok(val), Some(default)) if val.is_empty() => result.push_str(default),
            (Ok(val), _) => result.push_str(&val),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {}
        }
        rest = &body[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Address, ServerSpec};

    fn write_config(dir: &tempfile::TempDir, content: &str) -> String {
        let path = dir.path().join("pool.yaml");
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn load_config_parses_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "servers:\n  - \"@logs.example.com\"\n  - backup:9000\n  - \"[::1]:5043\"\nrfc2782: true\nrfc2782_service: courier\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.servers.len(), 3);
        assert_eq!(config.servers[0], ServerSpec::Srv("logs.example.com".into()));
        assert_eq!(
            config.servers[1],
            ServerSpec::Direct(Address::Domain("backup".into(), 9000))
        );
        assert_eq!(
            config.server_list(),
            vec!["@logs.example.com", "backup:9000", "[::1]:5043"]
        );
        assert!(config.rfc2782);
        assert_eq!(config.log.level, "info");
        assert!(config.dns.is_none());
    }

    #[test]
    fn load_config_rejects_empty_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "servers: []\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("at least one server"));
    }

    #[test]
    fn load_config_rejects_bad_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "servers:\n  - host:abc\n");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid port given: abc"));
    }

    #[test]
    fn load_config_requires_service_in_rfc2782_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "servers: [\"@logs.example.com\"]\nrfc2782: true\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn load_config_expands_env() {
        std::env::set_var("ADDRPOOL_TEST_BACKUP_PORT", "9100");
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "servers:\n  - backup:${ADDRPOOL_TEST_BACKUP_PORT}\n  - spare:${ADDRPOOL_TEST_UNSET:-9200}\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.server_list(), vec!["backup:9100", "spare:9200"]);
    }

    #[test]
    fn expand_env_vars_only_touches_braced_form() {
        std::env::set_var("ADDRPOOL_TEST_HOST", "backup");
        assert_eq!(expand_env_vars("cost: $ 5"), "cost: $ 5");
        assert_eq!(
            expand_env_vars("$ADDRPOOL_TEST_HOST:${ADDRPOOL_TEST_HOST}"),
            "$ADDRPOOL_TEST_HOST:backup"
        );
        assert_eq!(expand_env_vars("x: ${ADDRPOOL_TEST_UNSET}y"), "x: y");
        assert_eq!(expand_env_vars("open ${ADDRPOOL_TEST_HOST"), "open ${ADDRPOOL_TEST_HOST");
    }
}
