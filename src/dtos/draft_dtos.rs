use serde::Deserialize;

/// Partial draft edit; absent fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct UpdateDraftIn {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachImageIn {
    pub image_data: String, // base64, optionally as a data URL
    pub file_name: String,
    pub content_type: String, // must be image/*
}
