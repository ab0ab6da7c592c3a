// ABOUTME: Integration tests for configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, defaults, validation, and environment overrides.

use ferry::config::*;
use ferry::error::Error;
use ferry::inject::{DEFAULT_PIPE_CAPACITY, DEFAULT_STAGING_DIR, WINDOWS_CONTAINER_ADMIN};
use ferry::runtime::RuntimeType;
use std::fs;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.pipe_capacity, DEFAULT_PIPE_CAPACITY);
        assert_eq!(config.helper.user, WINDOWS_CONTAINER_ADMIN);
        assert_eq!(config.helper.staging_dir, DEFAULT_STAGING_DIR);
        assert!(config.runtime.socket.is_none());
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
runtime:
  runtime: podman
  socket: /run/user/1000/podman/podman.sock
timeout: 2m 30s
helper:
  user: Administrator
  staging_dir: /staging
pipe_capacity: 1024
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.runtime.runtime, Some(RuntimeType::Podman));
        assert_eq!(
            config.runtime.socket.as_deref(),
            Some("/run/user/1000/podman/podman.sock")
        );
        assert_eq!(config.timeout, Duration::from_secs(150));
        assert_eq!(config.helper.user, "Administrator");
        assert_eq!(config.helper.staging_dir, "/staging");

        let options = config.inject_options();
        assert_eq!(options.pipe_capacity, 1024);
        assert_eq!(options.helper, config.helper);
    }

    #[test]
    fn partial_helper_keeps_other_defaults() {
        let config = Config::from_yaml("helper:\n  user: Administrator\n").unwrap();
        assert_eq!(config.helper.staging_dir, DEFAULT_STAGING_DIR);
    }

    #[test]
    fn zero_pipe_capacity_is_rejected() {
        let err = Config::from_yaml("pipe_capacity: 0").unwrap_err();
        assert!(err.to_string().contains("pipe_capacity"));
    }

    #[test]
    fn relative_staging_dir_is_rejected() {
        let err = Config::from_yaml("helper:\n  staging_dir: windows\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn unknown_runtime_is_rejected() {
        assert!(Config::from_yaml("runtime:\n  runtime: containerd\n").is_err());
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "timeout: 5s\n").unwrap();

        temp_env::with_var_unset(SOCKET_ENV, || {
            let config = Config::discover(dir.path()).unwrap();
            assert_eq!(config.timeout, Duration::from_secs(5));
        });
    }

    #[test]
    fn finds_file_in_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".ferry")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), "pipe_capacity: 4096\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.pipe_capacity, 4096);
    }

    #[test]
    fn missing_file_is_an_error_for_discover() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var_unset(SOCKET_ENV, || {
            let config = Config::discover_or_default(dir.path()).unwrap();
            assert_eq!(config, Config::default());
        });
    }

    #[test]
    fn broken_file_is_not_replaced_by_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "timeout: [").unwrap();
        let err = Config::discover_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }
}

mod environment {
    use super::*;

    #[test]
    fn socket_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "runtime:\n  socket: /var/run/docker.sock\n",
        )
        .unwrap();

        temp_env::with_var(SOCKET_ENV, Some("/tmp/engine.sock"), || {
            let config = Config::discover(dir.path()).unwrap();
            assert_eq!(config.runtime.socket.as_deref(), Some("/tmp/engine.sock"));
        });
    }

    #[test]
    fn socket_env_applies_without_file() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var(SOCKET_ENV, Some("/tmp/engine.sock"), || {
            let config = Config::discover_or_default(dir.path()).unwrap();
            assert_eq!(config.runtime.socket.as_deref(), Some("/tmp/engine.sock"));
        });
    }

    #[test]
    fn empty_socket_env_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "runtime:\n  socket: /var/run/docker.sock\n",
        )
        .unwrap();

        temp_env::with_var(SOCKET_ENV, Some(""), || {
            let config = Config::discover(dir.path()).unwrap();
            assert_eq!(config.runtime.socket.as_deref(), Some("/var/run/docker.sock"));
        });
    }
}
