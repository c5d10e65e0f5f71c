use serde::{Deserialize, Serialize};

/// A production program: a unique code plus opaque numeric parameters and the
/// matrizaria entries it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Programa {
    pub codigo: String,
    pub padrao1: f64,
    pub qtd_matrizes: i64,
    #[serde(default)]
    pub dados_matrizaria: Vec<MatrizEntry>,
}

/// One matrizaria entry. Belongs to exactly one [`Programa`]; the whole set
/// is replaced on every write, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrizEntry {
    pub numeracao: f64,
    pub matrizes: f64,
    #[serde(rename = "girosInicial")]
    pub giros_inicial: f64,
}
