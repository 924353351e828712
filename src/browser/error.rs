//! Tipos de erro para a automação do navegador.
//!
//! Define [`BrowserError`] com variantes para esperas que expiraram, elementos
//! ausentes e erros de protocolo ou de rede do endpoint WebDriver. Usa
//! `thiserror` para derivar `Display` e `Error`.

use std::time::Duration;

use thiserror::Error;

/// Erros retornados por uma [`BrowserSession`](super::BrowserSession).
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Uma espera limitada expirou antes da condição ser satisfeita.
    #[error("timed out after {}ms waiting for {what}", after.as_millis())]
    Timeout { what: String, after: Duration },

    /// Nenhum elemento encontrado, ou um elemento já encontrado sumiu.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// O endpoint WebDriver respondeu com um payload de erro.
    #[error("webdriver error (status {status}): {error}: {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    /// O WebDriver respondeu com um corpo que não foi possível interpretar.
    #[error("unexpected webdriver response: {0}")]
    UnexpectedResponse(String),

    /// Falha de rede ao falar com o endpoint WebDriver.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl BrowserError {
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    /// Verdadeiro quando a falha significa "ainda não existe", e não uma sessão quebrada.
    pub fn is_missing(&self) -> bool {
        match self {
            BrowserError::Timeout { .. } | BrowserError::NoSuchElement(_) => true,
            BrowserError::Protocol { error, .. } => {
                error == "no such element" || error == "stale element reference"
            }
            _ => false,
        }
    }
}
