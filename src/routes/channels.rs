use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::Deserialize;

use crate::AppState;

#[derive(Deserialize)]
pub struct ChannelQuery {
    pub active: Option<bool>,
}

pub async fn list_channels(State(state): State<AppState>, Query(query): Query<ChannelQuery>) -> impl IntoResponse {
    match crate::db::list_channels(&state.db).await {
        Ok(channels) => {
            let channels: Vec<_> = match query.active {
                Some(active) => channels.into_iter().filter(|c| c.is_active == active).collect(),
                None => channels,
            };
            AxumJson(channels).into_response()
        }
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}
