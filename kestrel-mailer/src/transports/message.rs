use crate::{Email, MailerError};
use lettre::Message;
use lettre::message::{MultiPart, SinglePart};

/// Convert an [`Email`] into a lettre [`Message`], preferring a multipart
/// alternative body when both HTML and text are present.
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    let mut message_builder = Message::builder()
        .from(email.from.parse()?)
        .subject(email.subject);

    for to in email.to {
        message_builder = message_builder.to(to.parse()?);
    }

    if let Some(reply_to) = email.reply_to {
        message_builder = message_builder.reply_to(reply_to.parse()?);
    }

    let message = match (email.html_body, email.text_body) {
        (Some(html), Some(text)) => message_builder.multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(text))
                .singlepart(SinglePart::html(html)),
        )?,
        (Some(html), None) => message_builder.singlepart(SinglePart::html(html))?,
        (None, Some(text)) => message_builder.singlepart(SinglePart::plain(text))?,
        (None, None) => {
            return Err(MailerError::Builder("No email body provided".to_string()));
        }
    };

    Ok(message)
}
