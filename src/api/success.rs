use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Uniform result shape shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Cow<'static, str>>,
}

impl<T> Envelope<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self { success: true, data, message: None, error: None }
    }

    pub fn failure(error: impl Into<Cow<'static, str>>) -> Self {
        Self { success: false, data: None, message: None, error: Some(error.into()) }
    }
}

pub struct Success<T: Serialize> {
    pub status: actix_web::http::StatusCode,
    pub body: Option<Envelope<T>>,
    pub headers: Vec<(&'static str, &'static str)>,
}

impl<T: Serialize> Success<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            status: actix_web::http::StatusCode::OK,
            body: Some(Envelope::ok(data)),
            headers: Vec::new(),
        }
    }

    pub fn created(data: Option<T>) -> Self {
        Self {
            status: actix_web::http::StatusCode::CREATED,
            body: Some(Envelope::ok(data)),
            headers: Vec::new(),
        }
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<Cow<'static, str>>,
    {
        if let Some(body) = &mut self.body {
            body.message = Some(msg.into());
        }
        self
    }

    /// Poll responses must always reflect persisted state.
    pub fn no_store(mut self) -> Self {
        self.headers.push(("Cache-Control", "no-store"));
        self
    }
}

impl<T: Serialize> actix_web::Responder for Success<T> {
    type Body = actix_web::body::BoxBody;

    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        let mut response = HttpResponse::build(self.status);

        for header in self.headers {
            response.insert_header(header);
        }

        match self.body {
            Some(body) => response.json(body),
            None => response.finish(),
        }
    }
}
