use crate::{
    live,
    lobby::{error, Lobby},
    util::{query, token},
};
use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Bytes},
    header::{
        HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        CONTENT_TYPE,
    },
    Method, Request, Response, StatusCode,
};
use model::participant::{AnswerRequest, JoinRequest};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub type ResponseBody = Full<Bytes>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest request body accepted by any endpoint.
const MAX_BODY_SIZE: usize = 64 * 1024;
const DEFAULT_EXTENSION: i64 = 10;

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

#[derive(Deserialize)]
struct Extension {
    #[serde(default = "default_extension")]
    extra_seconds: i64,
}

const fn default_extension() -> i64 {
    DEFAULT_EXTENSION
}

fn json<T: Serialize>(value: &T) -> error::Result<Response<ResponseBody>> {
    let bytes = serde_json::to_vec(value).map_err(|err| {
        log::error!("failed to serialize response: {err}");
        error::Error::Fatal
    })?;
    let mut res = Response::new(Full::new(Bytes::from(bytes)));
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
    Ok(res)
}

fn failure(err: &error::Error) -> Response<ResponseBody> {
    let detail = err.to_string();
    let bytes = serde_json::to_vec(&Detail { detail: &detail }).unwrap_or_default();
    let mut res = Response::new(Full::new(Bytes::from(bytes)));
    *res.status_mut() = err.status();
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
    res
}

fn preflight() -> Response<ResponseBody> {
    let mut res = Response::new(Full::default());
    *res.status_mut() = StatusCode::NO_CONTENT;
    let headers = res.headers_mut();
    assert!(headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS")).is_none());
    assert!(headers
        .insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("content-type, x-admin-token"))
        .is_none());
    res
}

async fn read_bytes<B>(body: B) -> error::Result<Bytes>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let collected = Limited::new(body, MAX_BODY_SIZE).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            error::Error::TooLarge
        } else {
            log::warn!("failed to read request body: {err}");
            error::Error::Malformed
        }
    })?;
    Ok(collected.to_bytes())
}

async fn read_json<B, T>(body: B) -> error::Result<T>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let bytes = read_bytes(body).await?;
    serde_json::from_slice(&bytes).map_err(|_| error::Error::Malformed)
}

/// Reads the extension from the `extra_seconds` query parameter, else from an
/// optional JSON body.
async fn read_extension<B>(req: Request<B>) -> error::Result<i64>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if let Some(raw) = req.uri().query().and_then(|query| query::get(query, "extra_seconds")) {
        return raw.trim().parse().map_err(|_| error::Error::Malformed);
    }
    let bytes = read_bytes(req.into_body()).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(DEFAULT_EXTENSION);
    }
    let Extension { extra_seconds } = serde_json::from_slice(&bytes).map_err(|_| error::Error::Malformed)?;
    Ok(extra_seconds)
}

fn segment(raw: &str) -> error::Result<String> {
    query::decode(raw, false).ok_or(error::Error::Malformed)
}

async fn admin<B>(req: Request<B>, lobby: &Lobby, action: &str) -> error::Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let Some(secret) = token::extract_admin_token(&req) else {
        log::warn!("rejected admin request to {action:?} without a token");
        return Err(error::Error::InvalidToken);
    };
    if !lobby.is_admin(&secret) {
        log::warn!("rejected admin request to {action:?}");
        return Err(error::Error::InvalidToken);
    }

    let method = req.method().clone();
    match (method, action) {
        (Method::POST, "start") => json(&lobby.start()),
        (Method::POST, "next") => json(&lobby.advance()),
        (Method::POST, "prev") => json(&lobby.retreat()),
        (Method::POST, "reveal") => json(&lobby.reveal()),
        (Method::POST, "extend") => {
            let extra = read_extension(req).await?;
            json(&lobby.extend(extra))
        }
        (Method::POST, "reset") => json(&lobby.reset()),
        (Method::GET, "results") => json(&lobby.results()),
        (Method::GET, "participants") => json(&lobby.participants()),
        _ => Err(error::Error::NotFound),
    }
}

pub async fn try_respond<B>(req: Request<B>, lobby: &Arc<Lobby>) -> error::Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = String::from(req.uri().path());
    let segments: Vec<_> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::GET, ["state"]) => json(&lobby.state()),
        (Method::POST, ["join"]) => {
            let JoinRequest { name } = read_json(req.into_body()).await?;
            json(&lobby.join(&name)?)
        }
        (Method::GET, ["participant", id]) => json(&lobby.participant(&segment(id)?)?),
        (Method::POST, ["answer"]) => {
            let answer: AnswerRequest = read_json(req.into_body()).await?;
            json(&lobby.submit_answer(&answer))
        }
        (Method::GET, ["answer_status", id, question]) => {
            let question = question.parse().map_err(|_| error::Error::Malformed)?;
            json(&lobby.answer_status(&segment(id)?, question)?)
        }
        (Method::GET, ["scoreboard"]) => json(&lobby.scoreboard()?),
        (Method::GET, ["ws"]) => live::upgrade(req, Arc::clone(lobby)),
        (_, ["admin", action]) => admin(req, lobby, action).await,
        _ => Err(error::Error::NotFound),
    }
}

/// Routes the request and renders failures as `{"detail": ...}` bodies. Every
/// response allows cross-origin access.
pub async fn respond<B>(req: Request<B>, lobby: &Arc<Lobby>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let mut res = if req.method() == Method::OPTIONS {
        preflight()
    } else {
        let method = req.method().clone();
        let path = String::from(req.uri().path());
        match try_respond(req, lobby).await {
            Ok(res) => res,
            Err(err) => {
                if matches!(err, error::Error::Fatal) {
                    log::error!("{method} {path} failed: {err}");
                } else {
                    log::debug!("{method} {path} rejected: {err}");
                }
                failure(&err)
            }
        }
    };
    res.headers_mut().insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    res
}
