//! Transient query types: cut requests and roll listing filters.

use serde::{Deserialize, Serialize};

use super::client::ClientId;

/// Substring query on fabric type and color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub tipo_tela: String,
    pub color: String,
}

impl CandidateQuery {
    pub fn new(tipo_tela: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            tipo_tela: tipo_tela.into(),
            color: color.into(),
        }
    }
}

/// A demand for a length of fabric, owned by one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutRequest {
    pub cliente_id: ClientId,
    pub tipo_tela_query: String,
    pub color_query: String,
    /// Meters demanded; must be positive.
    pub metros_requeridos: f64,
}

impl CutRequest {
    pub fn new(
        cliente_id: ClientId,
        tipo_tela_query: impl Into<String>,
        color_query: impl Into<String>,
        metros_requeridos: f64,
    ) -> Self {
        Self {
            cliente_id,
            tipo_tela_query: tipo_tela_query.into(),
            color_query: color_query.into(),
            metros_requeridos,
        }
    }

    /// The catalog query this request implies.
    pub fn query(&self) -> CandidateQuery {
        CandidateQuery::new(self.tipo_tela_query.clone(), self.color_query.clone())
    }
}

/// Server-side filters for listing rolls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollFilter {
    pub cliente_id: Option<ClientId>,
    pub disponible: Option<bool>,
    pub tipo_tela: Option<String>,
    pub color: Option<String>,
}

impl RollFilter {
    /// All rolls of one client.
    pub fn for_client(cliente_id: ClientId) -> Self {
        Self {
            cliente_id: Some(cliente_id),
            ..Default::default()
        }
    }

    pub fn available(mut self, disponible: bool) -> Self {
        self.disponible = Some(disponible);
        self
    }

    pub fn tipo_tela(mut self, tipo_tela: impl Into<String>) -> Self {
        self.tipo_tela = Some(tipo_tela.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Query-string pairs, in a stable order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.cliente_id {
            pairs.push(("cliente_id", id.to_string()));
        }
        if let Some(d) = self.disponible {
            pairs.push(("disponible", d.to_string()));
        }
        if let Some(t) = &self.tipo_tela {
            pairs.push(("tipo_tela", t.clone()));
        }
        if let Some(c) = &self.color {
            pairs.push(("color", c.clone()));
        }
        pairs
    }

    /// Whether a roll passes this filter, using the record service's
    /// case-insensitive containment semantics for text fields.
    pub fn accepts(&self, roll: &super::Roll) -> bool {
        self.cliente_id.map_or(true, |id| roll.cliente_id == id)
            && self.disponible.map_or(true, |d| roll.disponible == d)
            && roll.matches(
                self.tipo_tela.as_deref().unwrap_or(""),
                self.color.as_deref().unwrap_or(""),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_pairs() {
        let filter = RollFilter::for_client(4).available(true).color("rojo");
        assert_eq!(
            filter.to_query_pairs(),
            vec![
                ("cliente_id", "4".to_string()),
                ("disponible", "true".to_string()),
                ("color", "rojo".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_filter_has_no_pairs() {
        assert!(RollFilter::default().to_query_pairs().is_empty());
    }

    #[test]
    fn test_request_query() {
        let req = CutRequest::new(1, "gabard", "azul", 80.0);
        assert_eq!(req.query(), CandidateQuery::new("gabard", "azul"));
    }
}
