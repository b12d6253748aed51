/// Image picked for the draft, held in memory until submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Not-yet-submitted post content owned by the feed controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub image: Option<ImageAttachment>,
}

impl Draft {
    /// Both title and content carry something other than whitespace.
    pub fn is_postable(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
