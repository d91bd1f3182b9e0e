use serde::Serialize;

/// Body of `GET /health`.
#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub server: &'static str,
}

impl Health {
    pub fn healthy() -> Self {
        Self { status: "healthy", server: "simple-server" }
    }
}
