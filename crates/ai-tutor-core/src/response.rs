//! Response assembly for `POST /api/tutor/ask`.
//!
//! Contract (camelCase JSON, unset fields are `null`):
//! `{ status, answer, chart, imageUrl, videoUrl, audioUrl }`.

use serde::Serialize;

use crate::error::{AnswerStatus, TutorError};
use crate::knowledge::KnowledgeTopic;
use crate::media::MediaPayload;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorResponse {
    pub status: AnswerStatus,
    pub answer: String,
    pub chart: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
}

impl TutorResponse {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            status: AnswerStatus::Ok,
            answer: text.into(),
            chart: None,
            image_url: None,
            video_url: None,
            audio_url: None,
        }
    }

    /// Knowledge-base hit: response and chart are returned verbatim.
    pub fn from_topic(topic: &KnowledgeTopic) -> Self {
        Self {
            chart: topic.chart.clone(),
            ..Self::answer(topic.response.clone())
        }
    }

    /// Failure mapped through the central classification step.
    pub fn from_error(err: &TutorError) -> Self {
        let (status, answer) = err.classify();
        Self {
            status,
            ..Self::answer(answer)
        }
    }

    pub fn with_media(mut self, media: MediaPayload) -> Self {
        match media {
            MediaPayload::Image(url) => self.image_url = Some(url),
            MediaPayload::Video(url) => self.video_url = Some(url),
            MediaPayload::Audio(url) => self.audio_url = Some(url),
        }
        self
    }
}
