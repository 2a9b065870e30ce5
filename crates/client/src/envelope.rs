use serde::Deserialize;

/// A response body that is either `{ "data": T }` or a bare `T`.
///
/// Endpoints differ in whether they wrap single-entity responses, so both
/// shapes are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}
