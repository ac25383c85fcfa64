mod assets;
mod auth;
mod screenshot;
mod view;

use db::Store;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Bytes},
    header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION, WWW_AUTHENTICATE},
    HeaderMap, Method, Request, Response, StatusCode,
};
use model::image::SaveImage;
use serde::Deserialize;
use std::path::PathBuf;

pub use auth::Credentials;
pub use screenshot::ImageSink;
pub use model::FixedOffset;

type Reply = Response<Full<Bytes>>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body. Screenshots are the biggest payloads.
const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Settings consumed by the handlers. Built once at startup.
pub struct Config {
    pub username: Box<str>,
    pub password: Box<str>,
    /// Directory of static assets. Screenshots are written here as well.
    pub static_dir: PathBuf,
    /// Civil timezone in which timestamps are displayed.
    pub offset: FixedOffset,
}

#[derive(Deserialize)]
struct AskForm {
    question: String,
}

#[derive(Deserialize)]
struct AnswerForm {
    answer: String,
}

fn html(text: String) -> Reply {
    let mut res = Response::new(Full::new(Bytes::from(text)));
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")).is_none());
    res
}

fn redirect(location: &'static str) -> Reply {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::SEE_OTHER;
    assert!(!res.headers_mut().append(LOCATION, HeaderValue::from_static(location)));
    res
}

fn parse_form<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T, StatusCode> {
    serde_urlencoded::from_bytes(bytes).map_err(|err| {
        log::warn!("Malformed form submission: {err}");
        StatusCode::BAD_REQUEST
    })
}

fn method_not_allowed(allow: &'static str) -> Reply {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    assert!(res.headers_mut().insert(ALLOW, HeaderValue::from_static(allow)).is_none());
    res
}

/// The database layer already logged the cause.
fn internal(_: db::error::Error) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

pub struct App {
    store: Store,
    credentials: Credentials,
    sink: ImageSink,
    static_dir: PathBuf,
    offset: FixedOffset,
}

impl App {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            sink: ImageSink::new(&config.static_dir),
            static_dir: config.static_dir.clone(),
            offset: config.offset,
        }
    }

    /// Handles a request, converting failures into bodiless responses with the matching status.
    pub async fn respond<B>(&self, req: Request<B>) -> Reply
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let code = match self.try_respond(req).await {
            Ok(res) => {
                log::debug!("{method} {path} -> {}", res.status());
                return res;
            }
            Err(code) => code,
        };

        log::info!("{method} {path} -> {code}");
        let mut res = Response::new(Full::new(Bytes::new()));
        *res.status_mut() = code;
        if code == StatusCode::UNAUTHORIZED {
            assert!(!res.headers_mut().append(WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"ama\"")));
        }
        res
    }

    pub async fn try_respond<B>(&self, req: Request<B>) -> Result<Reply, StatusCode>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();
        let method = &parts.method;
        let headers = &parts.headers;

        match path {
            "/" if method == Method::GET => Ok(html(view::index())),
            "/ask" if method == Method::GET => Ok(html(view::ask(false))),
            "/ask" if method == Method::POST => {
                let bytes = Self::collect(body).await?;
                let AskForm { question } = parse_form(&bytes)?;
                self.on_ask(&question).await
            }
            "/admin" if method == Method::GET => {
                let user = self.credentials.authenticate(headers)?;
                Ok(html(view::admin(&user)))
            }
            "/questions" if method == Method::GET => self.on_questions(headers).await,
            "/answered_questions" if method == Method::GET => self.on_answered_questions().await,
            "/save_image" if method == Method::POST => {
                let bytes = Self::collect(body).await?;
                self.on_save_image(&bytes).await
            }
            "/" | "/admin" | "/questions" | "/answered_questions" => Ok(method_not_allowed("GET")),
            "/ask" => Ok(method_not_allowed("GET, POST")),
            "/save_image" => Ok(method_not_allowed("POST")),
            _ => {
                if let Some(id) = path.strip_prefix("/questions/") {
                    if method != Method::GET {
                        return Ok(method_not_allowed("GET"));
                    }
                    return self.on_share(headers, id).await;
                }

                if let Some(id) = path.strip_prefix("/answer_question/") {
                    if method != Method::POST {
                        return Ok(method_not_allowed("POST"));
                    }
                    self.credentials.authenticate(headers)?;
                    let bytes = Self::collect(body).await?;
                    let AnswerForm { answer } = parse_form(&bytes)?;
                    return self.on_answer(id, &answer).await;
                }

                if let Some(file) = path.strip_prefix("/static/") {
                    if method != Method::GET {
                        return Ok(method_not_allowed("GET"));
                    }
                    let (bytes, mime) = assets::read(&self.static_dir, file).await?;
                    let mut res = Response::new(Full::new(Bytes::from(bytes)));
                    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(mime)).is_none());
                    return Ok(res);
                }

                Err(StatusCode::NOT_FOUND)
            }
        }
    }

    async fn collect<B>(body: B) -> Result<Bytes, StatusCode>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        match Limited::new(body, MAX_BODY_SIZE).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.is::<LengthLimitError>() => {
                log::warn!("Request body exceeds {MAX_BODY_SIZE} bytes.");
                Err(StatusCode::PAYLOAD_TOO_LARGE)
            }
            Err(err) => {
                log::warn!("Cannot read request body: {err}");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }

    async fn on_ask(&self, question: &str) -> Result<Reply, StatusCode> {
        let session = self.store.session().await.map_err(internal)?;
        match session.create(question).await {
            Ok(created) => log::info!("New question {} submitted.", created.id),
            Err(db::error::Error::BadInput) => return Err(StatusCode::BAD_REQUEST),
            Err(err) => return Err(internal(err)),
        }
        Ok(html(view::ask(true)))
    }

    async fn on_questions(&self, headers: &HeaderMap) -> Result<Reply, StatusCode> {
        self.credentials.authenticate(headers)?;
        let session = self.store.session().await.map_err(internal)?;
        let questions = session.list_all(true).await.map_err(internal)?;
        drop(session);
        Ok(html(view::questions(&questions, self.offset)))
    }

    async fn on_share(&self, headers: &HeaderMap, id: &str) -> Result<Reply, StatusCode> {
        self.credentials.authenticate(headers)?;
        let session = self.store.session().await.map_err(internal)?;
        let Some(question) = session.get(id).await.map_err(internal)? else {
            return Ok(redirect("/questions"));
        };
        drop(session);
        Ok(html(view::share(&question, self.offset)))
    }

    async fn on_answer(&self, id: &str, answer: &str) -> Result<Reply, StatusCode> {
        let session = self.store.session().await.map_err(internal)?;
        match session.set_answer(id, answer).await {
            Ok(()) => log::info!("Question {id} answered."),
            Err(db::error::Error::NotFound) => log::warn!("Attempted to answer missing question {id}."),
            Err(err) => return Err(internal(err)),
        }
        Ok(redirect("/questions"))
    }

    async fn on_answered_questions(&self) -> Result<Reply, StatusCode> {
        let session = self.store.session().await.map_err(internal)?;
        let questions = session.list_answered().await.map_err(internal)?;
        drop(session);
        Ok(html(view::answered(&questions, self.offset)))
    }

    async fn on_save_image(&self, bytes: &[u8]) -> Result<Reply, StatusCode> {
        let SaveImage { image } = serde_json::from_slice(bytes).map_err(|_| StatusCode::BAD_REQUEST)?;
        let image = image.filter(|url| !url.is_empty()).ok_or(StatusCode::BAD_REQUEST)?;
        let url = self.sink.save(&image).await?;

        let json = serde_json::to_vec(&model::image::SavedImage { url }).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut res = Response::new(Full::new(Bytes::from(json)));
        assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
        Ok(res)
    }
}
