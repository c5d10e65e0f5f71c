use anyhow::Result;
use std::collections::HashMap;

use tracing::error;

use crate::programa_store::{MatrizEntry, Programa, ProgramaStore, StoreError};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

#[derive(Serialize)]
struct SavedResponse {
    message: &'static str,
    codigo: String,
}

#[derive(Serialize)]
struct RemovedResponse {
    message: &'static str,
    removed: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize, Debug)]
struct SaveProgramaBody {
    // Defaulted so an absent codigo reaches the presence check below instead
    // of being rejected by the JSON extractor.
    #[serde(default)]
    pub codigo: String,
    pub padrao1: f64,
    pub qtd_matrizes: i64,
    #[serde(default)]
    pub dados_matrizaria: Vec<MatrizEntry>,
}

#[derive(Deserialize, Debug)]
struct UpdateProgramaBody {
    pub padrao1: f64,
    pub qtd_matrizes: i64,
    #[serde(default)]
    pub dados_matrizaria: Vec<MatrizEntry>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn store_error_response(context: &str, err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "Programa não encontrado")
        }
        StoreError::Storage(err) => {
            error!("{} storage error: {:#}", context, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err))
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

async fn save_programa(
    State(store): State<GuardedProgramaStore>,
    Json(body): Json<SaveProgramaBody>,
) -> Response {
    if body.codigo.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "codigo requerido");
    }

    let programa = Programa {
        codigo: body.codigo,
        padrao1: body.padrao1,
        qtd_matrizes: body.qtd_matrizes,
        dados_matrizaria: body.dados_matrizaria,
    };
    match store.upsert(&programa) {
        Ok(()) => Json(SavedResponse {
            message: "Programa salvo/atualizado com sucesso",
            codigo: programa.codigo,
        })
        .into_response(),
        Err(err) => store_error_response("POST /programa", err),
    }
}

async fn get_programa(
    State(store): State<GuardedProgramaStore>,
    Path(codigo): Path<String>,
) -> Response {
    match store.get(&codigo) {
        Ok(programa) => Json(programa).into_response(),
        Err(err) => store_error_response("GET /programa", err),
    }
}

async fn update_programa(
    State(store): State<GuardedProgramaStore>,
    Path(codigo): Path<String>,
    Json(body): Json<UpdateProgramaBody>,
) -> Response {
    let programa = Programa {
        codigo,
        padrao1: body.padrao1,
        qtd_matrizes: body.qtd_matrizes,
        dados_matrizaria: body.dados_matrizaria,
    };
    match store.update(&programa) {
        Ok(()) => Json(SavedResponse {
            message: "Programa atualizado",
            codigo: programa.codigo,
        })
        .into_response(),
        Err(err) => store_error_response("PUT /programa", err),
    }
}

async fn delete_programa(
    State(store): State<GuardedProgramaStore>,
    Path(codigo): Path<String>,
) -> Response {
    match store.delete(&codigo) {
        Ok(removed) => Json(RemovedResponse {
            message: "Programa removido",
            removed,
        })
        .into_response(),
        Err(err) => store_error_response("DELETE /programa/{codigo}", err),
    }
}

/// Wipes the whole store. Disabled unless the server runs with --allow-wipe,
/// and even then the caller must confirm with ?confirm=all.
async fn wipe_programas(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.config.allow_wipe {
        return error_response(StatusCode::FORBIDDEN, "limpeza total desabilitada");
    }
    if query.get("confirm").map(String::as_str) != Some("all") {
        return error_response(
            StatusCode::BAD_REQUEST,
            "confirmação necessária: ?confirm=all",
        );
    }

    match state.programa_store.wipe() {
        Ok(removed) => Json(RemovedResponse {
            message: "Banco limpo",
            removed,
        })
        .into_response(),
        Err(err) => store_error_response("DELETE /programa", err),
    }
}

pub fn make_app(config: ServerConfig, programa_store: GuardedProgramaStore) -> Router {
    let state = ServerState {
        config,
        programa_store,
    };

    let programa_routes: Router = Router::new()
        .route("/programa", post(save_programa))
        .route("/programa", delete(wipe_programas))
        .route("/programa/{codigo}", get(get_programa))
        .route("/programa/{codigo}", put(update_programa))
        .route("/programa/{codigo}", delete(delete_programa))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .merge(programa_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, programa_store: GuardedProgramaStore) -> Result<()> {
    let port = config.port;
    let app = make_app(config, programa_store);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
