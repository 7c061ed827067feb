pub mod cli;
pub mod http;
pub mod rpc;

use crate::error::ServiceError;
use serde::Serialize;
use serde_json::{json, Value};

pub const SERVER_NAME: &str = "tubejobs";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// An operation both front ends expose, under the same name.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Tool {
    pub name: &'static str,
    #[serde(skip)]
    pub description: &'static str,
    pub method: &'static str,
    pub endpoint: &'static str,
}

pub const TOOLS: &[Tool] = &[
    Tool {
        name: "download_video",
        description: "Start downloading a single video. Returns a job ID to track download progress.",
        method: "POST",
        endpoint: "/download_video",
    },
    Tool {
        name: "download_playlist",
        description: "Start downloading an entire playlist. Returns a job ID to track download progress.",
        method: "POST",
        endpoint: "/download_playlist",
    },
    Tool {
        name: "get_download_status",
        description: "Check the status of a download job.",
        method: "GET",
        endpoint: "/status/{job_id}",
    },
    Tool {
        name: "cancel_download",
        description: "Cancel a running or pending download job.",
        method: "POST",
        endpoint: "/cancel/{job_id}",
    },
    Tool {
        name: "list_downloads",
        description: "List all download jobs with their current status, newest first.",
        method: "GET",
        endpoint: "/downloads",
    },
    Tool {
        name: "get_video_metadata",
        description: "Fetch metadata about a video or playlist without downloading it.",
        method: "POST",
        endpoint: "/metadata",
    },
];

pub fn submitted_body(job_id: &str, message: &str) -> Value {
    json!({
        "job_id": job_id,
        "status": "pending",
        "message": message,
    })
}

pub fn cancelled_body(job_id: &str) -> Value {
    json!({
        "job_id": job_id,
        "status": "cancelled",
        "message": "Download cancelled",
    })
}

pub fn error_body(err: &ServiceError) -> Value {
    json!({ "error": err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let mut names: Vec<&str> = TOOLS.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), TOOLS.len());
    }

    #[test]
    fn test_tool_serializes_without_description() {
        let value = serde_json::to_value(TOOLS[0]).unwrap();
        assert_eq!(value["name"], "download_video");
        assert_eq!(value["endpoint"], "/download_video");
        assert!(value.get("description").is_none());
    }
}
