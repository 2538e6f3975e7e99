//! Wire models for the `sessions` endpoints and the persisted session.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Signed-in user as returned by `POST sessions` and persisted under the `user` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Display name.
	pub name: String,
	/// Login name.
	pub username: String,
}

/// Access/refresh token pair issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
	/// Short-lived bearer token attached to every request.
	pub access_token: TokenSecret,
	/// Long-lived token exchanged at `sessions/refresh`.
	pub refresh_token: TokenSecret,
}

/// Body of `POST sessions`.
#[derive(Clone, Serialize)]
pub struct SignInCredentials {
	/// Login name.
	pub username: String,
	/// Plain-text password; only ever sent to the backend.
	pub password: String,
}
impl SignInCredentials {
	/// Pairs a username with its password.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into() }
	}
}
impl Debug for SignInCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInCredentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Response of `POST sessions`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
	/// User that signed in.
	pub user: User,
	/// Initial bearer token.
	pub access_token: TokenSecret,
	/// Initial refresh token.
	pub refresh_token: TokenSecret,
}
impl SignInResponse {
	/// Splits the response into the user and the token pair.
	pub fn into_parts(self) -> (User, SessionTokens) {
		let tokens =
			SessionTokens { access_token: self.access_token, refresh_token: self.refresh_token };

		(self.user, tokens)
	}
}

/// Body of `POST sessions/refresh` and `DELETE sessions`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenBody<'a> {
	/// Refresh token being exchanged or revoked.
	pub refresh_token: &'a str,
}

/// Error payload carried by non-success responses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
	/// Human-readable message; `"Expired access token."` marks a refreshable 401.
	#[serde(default)]
	pub message: Option<String>,
}
