//! Chat commands sent from Slack

use axum::{Form, Json};
use tracing::debug;

use crate::api::types::{CommandForm, CommandReply};
use crate::commands;

/// POST /slack
///
/// Parses the command text and answers with the reply to show in the channel
pub async fn receive_command(Form(form): Form<CommandForm>) -> Json<CommandReply> {
    debug!("command: {:?}", form.text);

    Json(CommandReply {
        text: commands::parse(&form.text),
    })
}
