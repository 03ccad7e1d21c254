//! Shared fixtures: a small user domain covering every target shape, plus
//! helpers for driving the HTTP router in-process.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rest_gateway::domain::config::AuthConfig;
use rest_gateway::registry::{
    CommandRequest, CrudCommand, FormalParam, ObjectList, OperationDef, OperationModifier,
    TargetShape, TargetType, TypeInfo,
};
use rest_gateway::session::{SessionProvider, SessionUser};
use rest_gateway::{
    providers, ApiObject, GatewayConfig, ObjectRef, Preparable, TargetError, TargetRegistry, Value,
    ValueMap,
};
use std::any::Any;
use std::sync::Arc;
use tower::ServiceExt;

pub const API_USER: &str = "gateway";
pub const API_PASSWORD: &str = "s3cret";

pub const DATABASE_OBJECT: &str = "wcf\\data\\DatabaseObject";
pub const DECORATOR_BASE: &str = "wcf\\data\\DatabaseObjectDecorator";
pub const EDITABLE: &str = "wcf\\data\\IEditableObject";
pub const ABSTRACT_ACTION: &str = "wcf\\data\\AbstractDatabaseObjectAction";
pub const USER: &str = "wcf\\data\\user\\User";
pub const USER_EDITOR: &str = "wcf\\data\\user\\UserEditor";
pub const USER_PROFILE: &str = "wcf\\data\\user\\UserProfile";
pub const USER_LIST: &str = "wcf\\data\\user\\UserList";
pub const USER_ACTION: &str = "wcf\\data\\user\\UserAction";
pub const CORE: &str = "wcf\\system\\WCF";
pub const STRING_UTIL: &str = "wcf\\util\\StringUtil";
pub const GREETER: &str = "wcf\\system\\Greeter";

// =============================================================================
// DOMAIN OBJECTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

impl User {
    pub fn new(user_id: i64, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            email: format!("{}@example.org", username),
        }
    }
}

impl Preparable for User {}

impl ApiObject for User {
    fn type_name(&self) -> &str {
        USER
    }

    fn fields(&self) -> Vec<(String, Value)> {
        let mut settings = ValueMap::new();
        settings.insert("theme", "dark");
        settings.insert("password", "nested-secret");

        vec![
            ("userID".into(), Value::Int(self.user_id)),
            ("username".into(), self.username.as_str().into()),
            ("email".into(), self.email.as_str().into()),
            ("password".into(), "$2y$10$hash".into()),
            ("accessToken".into(), "tok-123".into()),
            ("userOptions".into(), Value::List(vec![Value::Int(1)])),
            ("databaseTableName".into(), "wcf1_user".into()),
            ("settings".into(), Value::Map(settings)),
        ]
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        (name == "avatarURL").then(|| Value::from(format!("https://cdn.example/avatars/{}.png", self.user_id)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct UserEditor {
    pub user: ObjectRef,
}

impl Preparable for UserEditor {}

impl ApiObject for UserEditor {
    fn type_name(&self) -> &str {
        USER_EDITOR
    }

    fn fields(&self) -> Vec<(String, Value)> {
        vec![("object".into(), Value::Object(Arc::clone(&self.user)))]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct UserProfile {
    pub user: ObjectRef,
}

impl Preparable for UserProfile {}

impl ApiObject for UserProfile {
    fn type_name(&self) -> &str {
        USER_PROFILE
    }

    fn fields(&self) -> Vec<(String, Value)> {
        let username = self
            .user
            .fields()
            .into_iter()
            .find(|(name, _)| name == "username")
            .map(|(_, v)| v)
            .unwrap_or_default();

        vec![
            ("username".into(), username.clone()),
            (
                "profileLink".into(),
                format!("/user/{}", username.as_str().unwrap_or_default()).into(),
            ),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct UserList {
    objects: Vec<Value>,
}

impl Preparable for UserList {}

impl ApiObject for UserList {
    fn type_name(&self) -> &str {
        USER_LIST
    }

    fn fields(&self) -> Vec<(String, Value)> {
        vec![
            ("objects".into(), Value::List(self.objects.clone())),
            ("count".into(), Value::Int(self.objects.len() as i64)),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ObjectList for UserList {
    fn read_objects(&mut self) -> Result<(), TargetError> {
        self.objects = vec![
            Value::object(User::new(1, "alice")),
            Value::object(User::new(2, "bob")),
        ];
        Ok(())
    }

    fn into_object(self: Box<Self>) -> ObjectRef {
        Arc::new(*self)
    }
}

#[derive(Debug)]
pub struct UserAction {
    request: CommandRequest,
}

impl Preparable for UserAction {}

impl ApiObject for UserAction {
    fn type_name(&self) -> &str {
        USER_ACTION
    }

    fn fields(&self) -> Vec<(String, Value)> {
        vec![
            ("actionName".into(), self.request.operation.as_str().into()),
            ("objectIDs".into(), Value::List(self.request.object_ids.clone())),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl CrudCommand for UserAction {
    fn validate(&mut self) -> Result<(), TargetError> {
        if self.request.operation == "delete"
            && self.request.object_ids.iter().any(|id| id.as_i64() == Some(1))
        {
            return Err(TargetError::PermissionDenied("user 1 is protected".into()));
        }
        if self.request.operation == "create"
            && self.request.parameters.get("username").map_or(true, Value::is_empty)
        {
            return Err(TargetError::empty("username"));
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<Value, TargetError> {
        let mut result = ValueMap::new();
        result.insert("affected", self.request.object_ids.len() as i64);
        result.insert("parameters", self.request.parameters.clone());
        Ok(Value::Map(result))
    }

    fn into_object(self: Box<Self>) -> ObjectRef {
        Arc::new(*self)
    }
}

#[derive(Debug, Default)]
pub struct Core;

impl Preparable for Core {}

impl ApiObject for Core {
    fn type_name(&self) -> &str {
        CORE
    }

    fn fields(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Greeter;

impl Preparable for Greeter {}

impl ApiObject for Greeter {
    fn type_name(&self) -> &str {
        GREETER
    }

    fn fields(&self) -> Vec<(String, Value)> {
        vec![("kind".into(), "greeter".into())]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

fn load_user(id: &str) -> Result<Option<ObjectRef>, TargetError> {
    let user: ObjectRef = match id {
        "1" => Arc::new(User::new(1, "alice")),
        "2" => Arc::new(User::new(2, "bob")),
        // row exists in the id index but carries no identity
        "99" => Arc::new(User::new(0, "")),
        _ => return Ok(None),
    };
    Ok(Some(user))
}

pub fn registry() -> TargetRegistry {
    let builder = TargetRegistry::builder()
        .type_only(TypeInfo::abstract_type(DATABASE_OBJECT))
        .type_only(TypeInfo::abstract_type(DECORATOR_BASE))
        .type_only(TypeInfo::interface(EDITABLE))
        .type_only(TypeInfo::abstract_type(ABSTRACT_ACTION))
        .register(
            TargetType::new(
                TypeInfo::concrete(USER).extends(DATABASE_OBJECT),
                TargetShape::entity("userID", load_user),
            )
            .with_operation(OperationDef::instance::<User, _>(
                "getTitle",
                Vec::new(),
                |user, _args| Ok(user.username.as_str().into()),
            ))
            .with_operation(OperationDef::instance::<User, _>(
                "greet",
                vec![FormalParam::required("greeting")],
                |user, args| {
                    let greeting = args.str("greeting").unwrap_or_default();
                    Ok(format!("{}, {}", greeting, user.username).into())
                },
            ))
            .with_operation(OperationDef::instance::<User, _>(
                "getProfileData",
                Vec::new(),
                |user, _args| {
                    let mut data = ValueMap::new();
                    data.insert("username", user.username.as_str());
                    data.insert("password", "$2y$10$hash");
                    data.insert("about", "hello");
                    Ok(Value::Map(data))
                },
            ))
            .with_operation(OperationDef::instance::<User, _>(
                "checkPermission",
                Vec::new(),
                |_user, _args| Err(TargetError::PermissionDenied("moderators only".into())),
            ))
            .with_operation(
                OperationDef::instance::<User, _>("getIdentity", Vec::new(), |user, _args| {
                    Ok(Value::Int(user.user_id))
                })
                .with_modifier(OperationModifier::Final),
            )
            .with_operation(OperationDef::abstract_op("getObjectType")),
        )
        .register(
            TargetType::new(
                TypeInfo::concrete(USER_EDITOR).extends(DATABASE_OBJECT),
                TargetShape::mutator(|user| Ok(Arc::new(UserEditor { user }) as ObjectRef)),
            )
            .with_operation(OperationDef::instance::<UserEditor, _>(
                "update",
                vec![FormalParam::required("username")],
                |_editor, args| Ok(format!("renamed to {}", args.str("username").unwrap_or_default()).into()),
            )),
        )
        .register(TargetType::new(
            TypeInfo::concrete(USER_PROFILE).extends(DECORATOR_BASE),
            TargetShape::wrapper(USER, |user| Ok(Arc::new(UserProfile { user }) as ObjectRef)),
        ))
        .register(TargetType::new(
            TypeInfo::concrete(USER_LIST),
            TargetShape::collection_query(|| Ok(Box::<UserList>::default() as Box<dyn ObjectList>)),
        ))
        .register(
            TargetType::new(
                TypeInfo::concrete(USER_ACTION).extends(ABSTRACT_ACTION),
                TargetShape::crud_command(|request| {
                    Ok(Box::new(UserAction { request }) as Box<dyn CrudCommand>)
                }),
            )
            .with_operation(OperationDef::declared("create"))
            .with_operation(OperationDef::declared("delete")),
        )
        .register(
            TargetType::new(
                TypeInfo::concrete(CORE),
                TargetShape::service_singleton(Arc::new(Core)),
            )
            .with_operation(OperationDef::instance::<Core, _>(
                "getPackageName",
                Vec::new(),
                |_core, _args| Ok("com.woltlab.wcf".into()),
            )),
        )
        .register(
            TargetType::new(TypeInfo::concrete(STRING_UTIL), TargetShape::Static).with_operation(
                OperationDef::static_op(
                    "trim",
                    vec![FormalParam::required("text")],
                    |args| Ok(args.str("text").unwrap_or_default().trim().into()),
                ),
            ),
        )
        .register(
            TargetType::new(
                TypeInfo::concrete(GREETER),
                TargetShape::plain(|| Ok(Arc::new(Greeter) as ObjectRef)),
            )
            .with_operation(OperationDef::instance::<Greeter, _>(
                "hello",
                vec![FormalParam::optional("name")],
                |_greeter, args| {
                    Ok(format!("hello {}", args.str("name").unwrap_or("world")).into())
                },
            )),
        );

    providers::register_builtin(builder)
        .build()
        .expect("fixture registry is consistent")
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Accepts `alice` / `wonderland` and the session `s-1` / `t-1`
pub struct FixtureSessions;

impl FixtureSessions {
    fn user(username: &str) -> SessionUser {
        SessionUser {
            username: username.to_string(),
            group_ids: vec![1, 3],
            language_ids: vec![1],
            language: Value::Null,
            has_administrative_access: false,
            banned: false,
            language_id: 1,
            session_id: "s-1".into(),
            security_token: "t-1".into(),
        }
    }
}

impl SessionProvider for FixtureSessions {
    fn resume(&self, session_id: &str, security_token: &str) -> Option<SessionUser> {
        (session_id == "s-1" && security_token == "t-1").then(|| Self::user("alice"))
    }

    fn login_username(&self, username: &str, password: &str) -> Option<SessionUser> {
        (username == "alice" && password == "wonderland").then(|| Self::user(username))
    }

    fn login_email(&self, email: &str, password: &str) -> Option<SessionUser> {
        (email == "alice@example.org" && password == "wonderland").then(|| Self::user("alice"))
    }
}

// =============================================================================
// HTTP HELPERS
// =============================================================================

pub fn config() -> GatewayConfig {
    GatewayConfig {
        auth: AuthConfig {
            username: API_USER.into(),
            password: API_PASSWORD.into(),
        },
        ..GatewayConfig::default()
    }
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Send one request through `router` with valid credentials
pub async fn call(router: Router, method: Method, uri: &str) -> Reply {
    send(router, method, uri, Some(basic(API_USER, API_PASSWORD)), None).await
}

pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    authorization: Option<String>,
    body: Option<serde_json::Value>,
) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    Reply {
        status,
        headers,
        body,
    }
}
