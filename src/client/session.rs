//! Sign-in, sign-out, and startup restore of the persisted session.

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenBody, SignInCredentials, SignInResponse, User},
	client::{ApiClient, SignOutReason},
	http::{ApiHttpClient, ApiRequest, Method},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::StoreKey,
};

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Signs in with `POST sessions`, persisting the user and both tokens and installing the
	/// new bearer.
	pub async fn sign_in(&self, credentials: SignInCredentials) -> Result<User> {
		const KIND: OpKind = OpKind::SignIn;

		let span = OpSpan::new(KIND, "sign_in");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let body = serde_json::to_value(&credentials).map_err(Error::Encode)?;
				let request =
					ApiRequest::new(Method::Post, self.config.endpoint(&self.config.sessions_path)?)
						.with_body(body);
				let response = self.http_client.execute(request).await?;

				if !response.is_success() {
					return Err(response.into_error());
				}

				let (user, tokens) = response.json::<SignInResponse>()?.into_parts();
				let user_json = serde_json::to_string(&user).map_err(Error::Encode)?;
				let _credentials = self.credentials.lock().await;

				self.set_bearer_token(Some(tokens.access_token.clone()));
				self.store.set(&self.config.store_key(StoreKey::User), user_json).await?;
				self.store
					.set(
						&self.config.store_key(StoreKey::AccessToken),
						tokens.access_token.expose().into(),
					)
					.await?;
				self.store
					.set(
						&self.config.store_key(StoreKey::RefreshToken),
						tokens.refresh_token.expose().into(),
					)
					.await?;

				Ok(user)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Clears the local session, then revokes the refresh token with `DELETE sessions`.
	///
	/// The local sign-out always happens; a failing revoke call is returned afterwards. No
	/// backend call is made when no refresh token was stored.
	pub async fn sign_out(&self) -> Result<()> {
		const KIND: OpKind = OpKind::SignOut;

		let span = OpSpan::new(KIND, "sign_out");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let cleared = self.clear_session(SignOutReason::Requested).await;
				let Some(refresh_token) = cleared.refresh_token else {
					return Ok(());
				};
				let body =
					serde_json::to_value(RefreshTokenBody { refresh_token: refresh_token.expose() })
						.map_err(Error::Encode)?;
				// The revoke still authenticates with the token that was just cleared.
				let request = ApiRequest::new(
					Method::Delete,
					self.config.endpoint(&self.config.sessions_path)?,
				)
				.with_body(body)
				.with_bearer(cleared.access_token);
				let response = self.http_client.execute(request).await?;

				if response.is_success() { Ok(()) } else { Err(response.into_error()) }
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Loads the stored user and mirrors the stored access token into the bearer.
	///
	/// Call once at startup. Returns `None` when nobody is signed in.
	pub async fn restore(&self) -> Result<Option<User>> {
		const KIND: OpKind = OpKind::Restore;

		let span = OpSpan::new(KIND, "restore");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _credentials = self.credentials.lock().await;
				let user = self.stored_user().await?;
				let access_token =
					self.store.get(&self.config.store_key(StoreKey::AccessToken)).await?;

				if let Some(access_token) = access_token {
					self.set_bearer_token(Some(access_token.into()));
				}

				Ok(user)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Signed-in user according to the store.
	pub async fn current_user(&self) -> Result<Option<User>> {
		self.stored_user().await
	}

	/// `true` while a user is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.stored_user().await?.is_some())
	}

	async fn stored_user(&self) -> Result<Option<User>> {
		let key = self.config.store_key(StoreKey::User);

		match self.store.get(&key).await? {
			Some(json) => serde_json::from_str(&json)
				.map(Some)
				.map_err(|source| Error::CorruptSession { key, source }),
			None => Ok(None),
		}
	}
}
