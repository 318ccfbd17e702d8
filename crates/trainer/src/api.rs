//! HTTP client for the puzzle endpoints.

use futures::future::BoxFuture;
use futures::FutureExt;
use puzzle_core::puzzle::{PuzzlePayload, RoundResponse, VoteResponse};
use puzzle_session::{PuzzleApi, SessionError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

pub struct HttpPuzzleApi {
    client: Client,
    base_url: String,
}

impl HttpPuzzleApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent("PuzzleTrainer/1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SessionError::Api(format!("Client error: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn post<T: DeserializeOwned + Send + 'static>(
        &self,
        path: String,
        body: serde_json::Value,
    ) -> BoxFuture<'static, Result<T, SessionError>> {
        let request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Accept", "application/json")
            .json(&body);
        async move { read_json(request.send().await).await }.boxed()
    }
}

async fn read_json<T: DeserializeOwned>(
    resp: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, SessionError> {
    let resp = resp.map_err(|e| SessionError::Api(format!("Request error: {e}")))?;
    if !resp.status().is_success() {
        return Err(SessionError::Api(format!("HTTP {}", resp.status())));
    }
    resp.json::<T>()
        .await
        .map_err(|e| SessionError::Api(format!("Body read error: {e}")))
}

impl PuzzleApi for HttpPuzzleApi {
    fn submit_round(
        &self,
        puzzle_id: &str,
        win: bool,
    ) -> BoxFuture<'static, Result<RoundResponse, SessionError>> {
        self.post(
            format!("/training/{puzzle_id}/round2"),
            json!({ "win": u8::from(win) }),
        )
    }

    fn next_puzzle(&self) -> BoxFuture<'static, Result<PuzzlePayload, SessionError>> {
        let request = self
            .client
            .get(format!("{}/training/new", self.base_url))
            .header("Accept", "application/json");
        async move { read_json(request.send().await).await }.boxed()
    }

    fn vote(&self, puzzle_id: &str, up: bool) -> BoxFuture<'static, Result<VoteResponse, SessionError>> {
        self.post(
            format!("/training/{puzzle_id}/vote"),
            json!({ "vote": u8::from(up) }),
        )
    }
}
