use std::path::PathBuf;

pub struct AppState {
    pub auth_token: String,
    /// Uploads are staged here before being moved into place.
    pub temp_dir: PathBuf,
}
