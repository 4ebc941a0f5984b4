//! Tipos de erro para o gateway do plano de controle.
//!
//! Define [`GatewayError`] com variantes para erros da API e erros de rede.
//! Nenhuma delas é retentada: qualquer falha do gateway encerra a invocação.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o plano de controle.
///
/// - [`ApiError`](GatewayError::ApiError): qualquer resposta HTTP fora de 2xx,
///   incluindo 429 (rate limit)
/// - [`NetworkError`](GatewayError::NetworkError): falha na camada de rede
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Erro retornado pela API (ex.: 403 sem permissão, 500 erro interno).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout, corpo inválido).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
