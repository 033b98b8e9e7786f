use serde::{Deserialize, Serialize};

pub mod etcd;

/// Envelope the orchestrator's API server wraps every response body in.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response<T: Serialize> {
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// Body returned alongside a non-2xx status from the API server.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrResponse {
    pub msg: String,
    pub cause: Option<String>,
}

impl<T> Response<T>
where
    T: Serialize,
{
    pub fn new(msg: Option<String>, data: Option<T>) -> Self {
        Self {
            msg,
            data,
        }
    }
}

impl ErrResponse {
    pub fn new(msg: String, cause: Option<String>) -> Self {
        Self {
            msg,
            cause,
        }
    }
}

impl std::fmt::Display for ErrResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.msg, cause),
            None => write!(f, "{}", self.msg),
        }
    }
}
