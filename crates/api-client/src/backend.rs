use std::future::Future;

use tutorchat_api::{
    ChatRequest, ChatResponse, SessionDetailResponse, SessionListResponse, UpdateTitleResponse,
};
use tutorchat_core::AuthContext;

use crate::{ApiClient, ApiError};

/// The backend operations the controllers depend on.
///
/// [`ApiClient`] is the HTTP implementation; tests substitute in-memory ones.
pub trait TutorBackend {
    fn list_sessions(
        &self,
        auth: &AuthContext,
    ) -> impl Future<Output = Result<SessionListResponse, ApiError>> + Send;

    fn session_detail(
        &self,
        id: &str,
        auth: &AuthContext,
    ) -> impl Future<Output = Result<SessionDetailResponse, ApiError>> + Send;

    fn update_title(
        &self,
        id: &str,
        title: &str,
        auth: &AuthContext,
    ) -> impl Future<Output = Result<UpdateTitleResponse, ApiError>> + Send;

    fn delete_session(
        &self,
        id: &str,
        auth: &AuthContext,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn send_chat(
        &self,
        request: &ChatRequest,
        auth: &AuthContext,
    ) -> impl Future<Output = Result<ChatResponse, ApiError>> + Send;
}

impl TutorBackend for ApiClient {
    async fn list_sessions(&self, auth: &AuthContext) -> Result<SessionListResponse, ApiError> {
        ApiClient::list_sessions(self, auth).await
    }

    async fn session_detail(
        &self,
        id: &str,
        auth: &AuthContext,
    ) -> Result<SessionDetailResponse, ApiError> {
        ApiClient::session_detail(self, id, auth).await
    }

    async fn update_title(
        &self,
        id: &str,
        title: &str,
        auth: &AuthContext,
    ) -> Result<UpdateTitleResponse, ApiError> {
        ApiClient::update_title(self, id, title, auth).await
    }

    async fn delete_session(&self, id: &str, auth: &AuthContext) -> Result<(), ApiError> {
        ApiClient::delete_session(self, id, auth).await
    }

    async fn send_chat(
        &self,
        request: &ChatRequest,
        auth: &AuthContext,
    ) -> Result<ChatResponse, ApiError> {
        ApiClient::send_chat(self, request, auth).await
    }
}
