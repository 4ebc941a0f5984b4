//! Tipos de dados trocados com o plano de controle via JSON.
//!
//! Todas as structs derivam `Serialize` e `Deserialize`. Os corpos de
//! requisição são enviados por [`HttpGateway`](super::HttpGateway).

use serde::{Deserialize, Serialize};

use crate::instance::{Instance, InstanceState};

/// Um filtro de descrição de instâncias, no formato `tag:<chave>`.
///
/// Uma lista de valores vazia significa apenas "a tag está presente".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Filter {
    /// Filtro que casa instâncias cuja tag `key` tem um dos `values`.
    pub fn tag(key: &str, values: Vec<String>) -> Self {
        Self {
            name: format!("tag:{key}"),
            values,
        }
    }

    /// Filtro que casa instâncias que possuem a tag `key`, qualquer valor.
    pub fn tag_present(key: &str) -> Self {
        Self::tag(key, Vec::new())
    }
}

/// Corpo de `POST /instances/describe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeRequest {
    pub filters: Vec<Filter>,
}

/// Resposta de `POST /instances/describe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeResponse {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// Corpo de `POST /instances/start` e `POST /instances/stop`.
///
/// `force` e `hibernate` só são enviados em pedidos de parada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionBody {
    pub instance_ids: Vec<String>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hibernate: Option<bool>,
}

/// Mudança de estado reportada em resposta a um pedido de transição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: String,
    pub previous_state: InstanceState,
    pub current_state: InstanceState,
}

/// Confirmação de um pedido de transição.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAck {
    #[serde(default)]
    pub transitions: Vec<StateChange>,
}

/// Corpo de `POST /instances/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub instance_ids: Vec<String>,
}

/// Estado atual de uma instância.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub id: String,
    pub state: InstanceState,
}

/// Resposta de `POST /instances/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub states: Vec<InstanceStatus>,
}
