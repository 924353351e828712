//! Configuração do quickapply carregada a partir de `quickapply.toml`.
//!
//! A struct [`Config`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam os defaults abaixo. Na primeira
//! execução o arquivo é criado interativamente. A variável de ambiente
//! `QUICKAPPLY_PASSWORD` tem precedência sobre a senha do arquivo.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pacing::Pacing;
use crate::prompt::Prompter;

pub const DEFAULT_CONFIG_PATH: &str = "quickapply.toml";
pub const PASSWORD_ENV: &str = "QUICKAPPLY_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not read answer from terminal: {0}")]
    Prompt(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Currículo enviado em cada candidatura.
    #[serde(default)]
    pub resume_path: PathBuf,

    /// Menor salário anunciado aceitável.
    #[serde(default = "default_min_salary")]
    pub min_salary: f64,

    /// Cidades pesquisadas em ordem; também a lista de locais permitidos.
    #[serde(default)]
    pub locations: Vec<String>,

    /// Endereço de casa usado no cálculo de distância.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,

    #[serde(default = "default_max_applications")]
    pub max_applications: u32,

    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Sem valor, a busca fica em branco (ampla).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_keywords: Option<String>,

    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Perfil dedicado do navegador; o perfil pessoal do usuário nunca é usado.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_profile_dir: Option<PathBuf>,

    /// Se presente, faz login com estas credenciais em vez de esperar o login manual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    #[serde(default = "default_login_wait_secs")]
    pub login_wait_secs: u64,
    #[serde(default = "default_upload_wait_secs")]
    pub upload_wait_secs: u64,
    #[serde(default = "default_page_pause_ms")]
    pub page_pause_ms: u64,
    #[serde(default = "default_min_pause_ms")]
    pub min_pause_ms: u64,
    #[serde(default = "default_max_pause_ms")]
    pub max_pause_ms: u64,
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,
}

fn default_min_salary() -> f64 {
    17.0
}

fn default_max_applications() -> u32 {
    50
}

fn default_log_path() -> PathBuf {
    PathBuf::from("applied_jobs_log.csv")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("applied_jobs.txt")
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("job_queue.json")
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from("cookies.json")
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_base_url() -> String {
    "https://www.indeed.com".to_string()
}

fn default_wait_secs() -> u64 {
    20
}

fn default_login_wait_secs() -> u64 {
    120
}

fn default_upload_wait_secs() -> u64 {
    5
}

fn default_page_pause_ms() -> u64 {
    2000
}

fn default_min_pause_ms() -> u64 {
    1000
}

fn default_max_pause_ms() -> u64 {
    3000
}

fn default_login_attempts() -> u32 {
    3
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_secs: default_wait_secs(),
            login_wait_secs: default_login_wait_secs(),
            upload_wait_secs: default_upload_wait_secs(),
            page_pause_ms: default_page_pause_ms(),
            min_pause_ms: default_min_pause_ms(),
            max_pause_ms: default_max_pause_ms(),
            login_attempts: default_login_attempts(),
        }
    }
}

impl Timing {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn login_wait(&self) -> Duration {
        Duration::from_secs(self.login_wait_secs)
    }

    pub fn upload_wait(&self) -> Duration {
        Duration::from_secs(self.upload_wait_secs)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::new(
            Duration::from_millis(self.min_pause_ms),
            Duration::from_millis(self.max_pause_ms),
            Duration::from_millis(self.page_pause_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resume_path: PathBuf::new(),
            min_salary: default_min_salary(),
            locations: Vec::new(),
            user_address: None,
            max_applications: default_max_applications(),
            log_path: default_log_path(),
            search_keywords: None,
            registry_path: default_registry_path(),
            queue_path: default_queue_path(),
            cookies_path: default_cookies_path(),
            webdriver_url: default_webdriver_url(),
            base_url: default_base_url(),
            browser_profile_dir: None,
            credentials: None,
            timing: Timing::default(),
        }
    }
}

impl Config {
    /// Lê `path`; `None` quando o arquivo não existe.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Carrega a configuração da execução, pedindo ao usuário para criá-la
    /// ou confirmá-la, a menos que `assume_yes` esteja ativo.
    pub fn load(
        path: &Path,
        assume_yes: bool,
        prompter: &impl Prompter,
    ) -> Result<Self, ConfigError> {
        let mut config = match Self::read(path)? {
            None => {
                tracing::info!(path = %path.display(), "no configuration found, starting setup");
                let config = prompt_for_config(prompter, &Config::default())?;
                config.save(path)?;
                config
            }
            Some(config) if assume_yes => config,
            Some(config) => {
                let answer = ask(prompter, "Use existing configuration? (Y/n): ")?;
                if answer.eq_ignore_ascii_case("n") {
                    let config = prompt_for_config(prompter, &config)?;
                    config.save(path)?;
                    config
                } else {
                    config
                }
            }
        };

        // A variável de ambiente tem precedência sobre o arquivo.
        if let Ok(password) = std::env::var(PASSWORD_ENV)
            && !password.is_empty()
        {
            config.apply_password(password);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_password(&mut self, password: String) {
        match &mut self.credentials {
            Some(credentials) => credentials.password = password,
            None => tracing::debug!("{PASSWORD_ENV} set but no credentials email configured"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resume_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("resume_path is required".into()));
        }
        if self.locations.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid("at least one location is required".into()));
        }
        if !self.min_salary.is_finite() || self.min_salary < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_salary must be a non-negative number, got {}",
                self.min_salary
            )));
        }
        if let Some(credentials) = &self.credentials
            && (credentials.email.trim().is_empty() || credentials.password.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "credentials need an email and a password (or {PASSWORD_ENV})"
            )));
        }
        Ok(())
    }
}

fn ask(prompter: &impl Prompter, question: &str) -> Result<String, ConfigError> {
    prompter
        .ask(question)
        .map(|answer| answer.trim().to_string())
        .map_err(ConfigError::Prompt)
}

/// Pergunta as configurações principais, oferecendo os valores de `current`
/// como padrão. O restante é copiado de `current`.
pub fn prompt_for_config(
    prompter: &impl Prompter,
    current: &Config,
) -> Result<Config, ConfigError> {
    let with_default = |label: &str, value: &str| {
        if value.is_empty() {
            format!("{label}: ")
        } else {
            format!("{label} [{value}]: ")
        }
    };
    let or_current = |answer: String, value: String| if answer.is_empty() { value } else { answer };

    let resume = ask(
        prompter,
        &with_default("Path to resume PDF", &current.resume_path.to_string_lossy()),
    )?;
    let resume_path = PathBuf::from(or_current(resume, current.resume_path.to_string_lossy().into_owned()));

    let salary = ask(
        prompter,
        &with_default("Minimum hourly wage", &current.min_salary.to_string()),
    )?;
    let min_salary = if salary.is_empty() {
        current.min_salary
    } else {
        salary
            .trim_start_matches('$')
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("minimum wage `{salary}` is not a number")))?
    };

    let joined = current.locations.join(", ");
    let locations = ask(
        prompter,
        &with_default("Locations (comma separated)", &joined),
    )?;
    let locations = or_current(locations, joined)
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let address = ask(
        prompter,
        &with_default(
            "Your home address (optional)",
            current.user_address.as_deref().unwrap_or_default(),
        ),
    )?;
    let user_address = if address.is_empty() {
        current.user_address.clone()
    } else {
        Some(address)
    };

    let max = ask(
        prompter,
        &with_default("Maximum applications", &current.max_applications.to_string()),
    )?;
    let max_applications = if max.is_empty() {
        current.max_applications
    } else {
        max.parse()
            .map_err(|_| ConfigError::Invalid(format!("maximum applications `{max}` is not a number")))?
    };

    let log = ask(
        prompter,
        &with_default("Log CSV path", &current.log_path.to_string_lossy()),
    )?;
    let log_path = PathBuf::from(or_current(log, current.log_path.to_string_lossy().into_owned()));

    Ok(Config {
        resume_path,
        min_salary,
        locations,
        user_address,
        max_applications,
        log_path,
        ..current.clone()
    })
}
