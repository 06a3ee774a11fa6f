use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, parse_cors_origins, parse_environment,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMHALL_HOST", "0.0.0.0");
        let port = env_or_default("EXAMHALL_PORT", "8000");

        let environment =
            parse_environment(env_optional("EXAMHALL_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("EXAMHALL_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Examhall API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = env_number("ACCESS_TOKEN_EXPIRE_MINUTES", 10_080u64)?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let cookie_secure = env_flag("AUTH_COOKIE_SECURE");
        let min_password_length = env_number("MIN_PASSWORD_LENGTH", 6usize)?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = env_number("POSTGRES_PORT", 5432u16)?;
        let postgres_user = env_or_default("POSTGRES_USER", "examhall");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "examhall_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", 6379u16)?;
        let redis_db = env_number("REDIS_DB", 0u16)?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let submit_grace_period_seconds = env_number("SUBMIT_GRACE_PERIOD_SECONDS", 30u64)?;
        let attempt_sweep_interval_seconds = env_number("ATTEMPT_SWEEP_INTERVAL_SECONDS", 60u64)?;

        let first_admin_email = env_or_default("FIRST_ADMIN_EMAIL", "admin@examhall.local");
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");
        let access_code = env_or_default("ADMIN_ACCESS_CODE", "");

        let log_level = env_or_default("EXAMHALL_LOG_LEVEL", "info");
        let json = env_flag("EXAMHALL_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                cookie_secure,
                min_password_length,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            exam: ExamSettings { submit_grace_period_seconds, attempt_sweep_interval_seconds },
            admin: AdminSettings { first_admin_email, first_admin_password, access_code },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.attempt_sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ATTEMPT_SWEEP_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.security.min_password_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MIN_PASSWORD_LENGTH",
                value: "0".to_string(),
            });
        }

        if self.security.access_token_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }
        if self.admin.access_code.is_empty() {
            return Err(ConfigError::MissingSecret("ADMIN_ACCESS_CODE"));
        }

        Ok(())
    }
}
