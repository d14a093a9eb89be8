use serde::Serialize;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Reply, Response},
    Filter,
};

use crate::{
    accounts::{self, normalize_email},
    constants::{MAX_CHAR_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH},
    cryptography::hash_password,
    error::ValidationError,
    form::{Form, FormData, Text},
    middleware::with_auth,
    schema::{User, UserChanges, UserProfile},
    state::{with_state, AppState},
};

use super::{
    error::ApiError,
    extract::{form_body, incomplete, respond},
};

const PASSWORD: Text = Text::required()
    .min(MIN_PASSWORD_LENGTH)
    .max(MAX_PASSWORD_LENGTH);
const NAME: Text = Text::required().max(MAX_CHAR_LENGTH);

#[derive(Serialize)]
struct IssuedToken {
    token: String,
}

async fn register(data: FormData, state: AppState) -> Result<Response, ApiError> {
    let mut form = Form::from_data(data);
    let fields = (
        form.email("email"),
        form.text("password", PASSWORD),
        form.text("name", NAME),
    );
    form.finish()?;
    let (Some(email), Some(password), Some(name)) = fields else {
        return Err(incomplete());
    };

    let user = accounts::create_user(state.store.as_ref(), &email, &password, &name).await?;
    let body = reply::json(&UserProfile::from(&user));
    Ok(reply::with_status(body, StatusCode::CREATED).into_response())
}

async fn login(data: FormData, state: AppState) -> Result<Response, ApiError> {
    let mut form = Form::from_data(data);
    let fields = (
        form.text("email", Text::required()),
        form.text("password", Text::required().untrimmed()),
    );
    form.finish()?;
    let (Some(email), Some(password)) = fields else {
        return Err(incomplete());
    };

    let user = accounts::authenticate(state.store.as_ref(), &email, &password)
        .await?
        .ok_or_else(|| {
            ValidationError::non_field("Unable to authenticate with provided credentials.")
        })?;

    let token = state.signer.issue(state.store.as_ref(), &user).await?;
    Ok(reply::json(&IssuedToken { token }).into_response())
}

async fn profile(user: User) -> Result<Response, ApiError> {
    Ok(reply::json(&UserProfile::from(&user)).into_response())
}

async fn update_profile(
    partial: bool,
    user: User,
    data: FormData,
    state: AppState,
) -> Result<Response, ApiError> {
    let mut form = if partial {
        Form::partial(data)
    } else {
        Form::from_data(data)
    };
    let email = form.email("email");
    let password = form.text("password", PASSWORD);
    let name = form.text("name", NAME);
    form.finish()?;

    let changes = UserChanges {
        email: email.as_deref().map(normalize_email),
        name,
        password: password.as_deref().map(hash_password).transpose()?,
    };
    let user = state
        .store
        .update_user(user.id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    log::debug!("Updated profile of user {}", user.id);
    Ok(reply::json(&UserProfile::from(&user)).into_response())
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|data: FormData, state: AppState| respond(register(data, state)));

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|data: FormData, state: AppState| respond(login(data, state)));

    let me = warp::path!("api" / "user" / "me");
    let get_me = me
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and_then(|user: User| respond(profile(user)));
    let put_me = me
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|user: User, data: FormData, state: AppState| {
            respond(update_profile(false, user, data, state))
        });
    let patch_me = me
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state))
        .and_then(|user: User, data: FormData, state: AppState| {
            respond(update_profile(true, user, data, state))
        });

    create
        .or(token)
        .unify()
        .or(get_me)
        .unify()
        .or(put_me)
        .unify()
        .or(patch_me)
        .unify()
        .boxed()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use warp::http::StatusCode;

    use crate::api::routes::testing::TestApp;

    fn payload() -> serde_json::Value {
        json!({
            "email": "test@example.com",
            "password": "testpass123",
            "name": "Test Name",
        })
    }

    #[tokio::test]
    async fn create_user_success() {
        let app = TestApp::new();

        let (status, body) = app.post("/api/user/create/", None, payload()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "email": "test@example.com", "name": "Test Name" }));
        assert!(body.get("password").is_none());

        let user = app.find_user("test@example.com").await.unwrap();
        assert!(crate::cryptography::verify_password("testpass123", &user.password).unwrap());
    }

    #[tokio::test]
    async fn user_with_email_exists_error() {
        let app = TestApp::new();
        app.post("/api/user/create/", None, payload()).await;

        let (status, body) = app.post("/api/user/create/", None, payload()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["email"][0], "user with this email already exists.");
    }

    #[tokio::test]
    async fn password_too_short_error() {
        let app = TestApp::new();
        let mut body = payload();
        body["password"] = json!("pw");

        let (status, errors) = app.post("/api/user/create/", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            errors["password"][0],
            "Ensure this field has at least 5 characters."
        );
        assert!(app.find_user("test@example.com").await.is_none());
    }

    #[tokio::test]
    async fn missing_fields_are_all_reported() {
        let app = TestApp::new();

        let (status, errors) = app.post("/api/user/create/", None, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        for field in ["email", "password", "name"] {
            assert_eq!(errors[field][0], "This field is required.", "{field}");
        }
    }

    #[tokio::test]
    async fn create_token_for_user() {
        let app = TestApp::new();
        app.post("/api/user/create/", None, payload()).await;

        let credentials = json!({ "email": "test@example.com", "password": "testpass123" });
        let (status, body) = app.post("/api/user/token/", None, credentials).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"].as_str().map(str::len), Some(40));
    }

    #[tokio::test]
    async fn create_token_bad_credentials() {
        let app = TestApp::new();
        app.post("/api/user/create/", None, payload()).await;

        let credentials = json!({ "email": "test@example.com", "password": "badpass" });
        let (status, body) = app.post("/api/user/token/", None, credentials).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("token").is_none());
        assert_eq!(
            body["non_field_errors"][0],
            "Unable to authenticate with provided credentials."
        );
    }

    #[tokio::test]
    async fn create_token_blank_password() {
        let app = TestApp::new();
        let credentials = json!({ "email": "test@example.com", "password": "" });

        let (status, body) = app.post("/api/user/token/", None, credentials).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["password"][0], "This field may not be blank.");
    }

    #[tokio::test]
    async fn retrieve_user_unauthorized() {
        let app = TestApp::new();

        let (status, body) = app.get("/api/user/me/", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Authentication credentials were not provided.");
    }

    #[tokio::test]
    async fn retrieve_profile_success() {
        let app = TestApp::new();
        let (_, token) = app.user("test@example.com").await;

        let (status, body) = app.get("/api/user/me/", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "email": "test@example.com", "name": "Test Name" }));
    }

    #[tokio::test]
    async fn post_me_not_allowed() {
        let app = TestApp::new();
        let (_, token) = app.user("test@example.com").await;

        let (status, _) = app.post("/api/user/me/", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn update_user_profile() {
        let app = TestApp::new();
        let (user, token) = app.user("test@example.com").await;

        let changes = json!({ "name": "Updated name", "password": "newpassword123" });
        let (status, body) = app.patch("/api/user/me/", Some(&token), changes).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Updated name");

        let user = app.find_user(&user.email).await.unwrap();
        assert_eq!(user.name, "Updated name");
        assert!(crate::cryptography::verify_password("newpassword123", &user.password).unwrap());
    }

    #[tokio::test]
    async fn put_requires_every_field() {
        let app = TestApp::new();
        let (_, token) = app.user("test@example.com").await;

        let (status, errors) = app
            .put("/api/user/me/", Some(&token), json!({ "name": "Only name" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(errors["email"][0], "This field is required.");
        assert_eq!(errors["password"][0], "This field is required.");
    }

    #[tokio::test]
    async fn updated_email_is_normalized_and_unique() {
        let app = TestApp::new();
        let (_, token) = app.user("test@example.com").await;
        app.user("other@example.com").await;

        let (status, body) = app
            .patch("/api/user/me/", Some(&token), json!({ "email": "New@EXAMPLE.com" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "New@example.com");

        let (status, errors) = app
            .patch("/api/user/me/", Some(&token), json!({ "email": "other@example.com" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(errors["email"][0], "user with this email already exists.");
    }
}
