//! # Session Protocol
//!
//! Newline-delimited JSON messages exchanged with a phone. Every message is
//! one object tagged by `type`:
//!
//! ```text
//! {"type":"gyro_data","alpha":12.0,"beta":-3.5,"gamma":40.1}
//! {"type":"main_status_changed","is_main":true}
//! ```

use serde::{Deserialize, Serialize};

/// Message sent by a phone.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Device orientation in degrees.
    GyroData {
        #[serde(default)]
        alpha: f64,
        #[serde(default)]
        beta: f64,
        #[serde(default)]
        gamma: f64,
    },
    /// Position of a layout slider.
    SliderValue { id: String, value: f64 },
    /// Request or give up the main role.
    SetMainDevice { is_main: bool },
    /// A layout button was pressed.
    ButtonDown { id: String },
    /// A layout button was released.
    ButtonUp { id: String },
    HideOverlay,
}

/// Message sent to a phone.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent on connect in driving mode; `current_main` tells whether another
    /// session already holds the role.
    AskMainDevice { current_main: bool },
    MainStatusChanged { is_main: bool },
    Error { message: String },
}

impl ServerMessage {
    /// Encodes the message as one protocol line, including the newline.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if serialization fails.
    pub fn to_line(&self) -> crate::error::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
