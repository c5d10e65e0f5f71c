//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all producao-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Programa Endpoints
    // ========================================================================

    /// POST /programa with an explicit JSON body
    pub async fn save_programa_raw(&self, body: &serde_json::Value) -> Response {
        self.client
            .post(format!("{}/programa", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Save programa request failed")
    }

    /// POST /programa
    pub async fn save_programa(
        &self,
        codigo: &str,
        padrao1: f64,
        qtd_matrizes: i64,
        dados_matrizaria: &[serde_json::Value],
    ) -> Response {
        self.save_programa_raw(&json!({
            "codigo": codigo,
            "padrao1": padrao1,
            "qtd_matrizes": qtd_matrizes,
            "dados_matrizaria": dados_matrizaria,
        }))
        .await
    }

    /// GET /programa/{codigo}
    pub async fn get_programa(&self, codigo: &str) -> Response {
        self.client
            .get(format!("{}/programa/{}", self.base_url, codigo))
            .send()
            .await
            .expect("Get programa request failed")
    }

    /// PUT /programa/{codigo}
    pub async fn update_programa(
        &self,
        codigo: &str,
        padrao1: f64,
        qtd_matrizes: i64,
        dados_matrizaria: &[serde_json::Value],
    ) -> Response {
        self.client
            .put(format!("{}/programa/{}", self.base_url, codigo))
            .json(&json!({
                "padrao1": padrao1,
                "qtd_matrizes": qtd_matrizes,
                "dados_matrizaria": dados_matrizaria,
            }))
            .send()
            .await
            .expect("Update programa request failed")
    }

    /// DELETE /programa/{codigo}
    pub async fn delete_programa(&self, codigo: &str) -> Response {
        self.client
            .delete(format!("{}/programa/{}", self.base_url, codigo))
            .send()
            .await
            .expect("Delete programa request failed")
    }

    /// DELETE /programa?confirm=all
    pub async fn wipe_programas(&self) -> Response {
        self.client
            .delete(format!("{}/programa?confirm=all", self.base_url))
            .send()
            .await
            .expect("Wipe request failed")
    }

    /// DELETE /programa without the confirmation parameter
    pub async fn wipe_programas_unconfirmed(&self) -> Response {
        self.client
            .delete(format!("{}/programa", self.base_url))
            .send()
            .await
            .expect("Wipe request failed")
    }
}

/// Builds one dados_matrizaria entry in wire format.
pub fn matriz_entry(numeracao: f64, matrizes: f64, giros_inicial: f64) -> serde_json::Value {
    json!({
        "numeracao": numeracao,
        "matrizes": matrizes,
        "girosInicial": giros_inicial,
    })
}
