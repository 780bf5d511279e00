use teloxide::utils::html;

use super::entity::CallbackData;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// Structured message: every bot answer is one of these, never bare text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Card {
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
}

impl Card {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field { name: name.into(), value: value.into() });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }

    pub fn to_html(&self) -> String {
        let mut text = html::bold(&html::escape(&self.title));
        if !self.description.is_empty() {
            text.push_str("\n\n");
            text.push_str(&html::escape(&self.description));
        }
        for field in &self.fields {
            text.push_str("\n\n");
            text.push_str(&html::bold(&html::escape(&field.name)));
            text.push('\n');
            text.push_str(&html::escape(&field.value));
        }
        if let Some(footer) = &self.footer {
            text.push_str("\n\n");
            text.push_str(&html::italic(&html::escape(footer)));
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyButton {
    pub label: &'static str,
    pub data: CallbackData,
}

/// Inline buttons, one row per inner vec
pub type Keyboard = Vec<Vec<KeyButton>>;

/// What the platform layer has to do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to send (foreign text, expired button)
    Ignore,
    /// Public message in the chat the event came from
    Message { card: Card, keyboard: Keyboard },
    /// Replace the message carrying the clicked button
    Edit { card: Card, keyboard: Keyboard },
    /// Answer to the user's text message
    Reply(Card),
    /// Card only the invoking user sees
    Private(Card),
    /// Short notice only the invoking user sees
    Notice(String),
    /// Re-register the command list and report back
    SyncCommands,
}

impl Reply {
    pub fn card(&self) -> Option<&Card> {
        match self {
            Self::Message { card, .. } | Self::Edit { card, .. } | Self::Reply(card) | Self::Private(card) => Some(card),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Self::Message { keyboard, .. } | Self::Edit { keyboard, .. } => Some(keyboard),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_order() {
        let card = Card::new("Title", "Body")
            .field("One", "1")
            .field("Two", "2")
            .footer("foot");
        assert_eq!(card.to_html(), "<b>Title</b>\n\nBody\n\n<b>One</b>\n1\n\n<b>Two</b>\n2\n\n<i>foot</i>");
    }

    #[test]
    fn escapes_user_text() {
        let card = Card::new("<script>", "").footer("Requested by A & B");
        assert_eq!(card.to_html(), "<b>&lt;script&gt;</b>\n\n<i>Requested by A &amp; B</i>");
    }

    #[test]
    fn field_lookup_by_name() {
        let card = Card::new("t", "d").field("Cost", "$7.00");
        assert_eq!(card.field_value("Cost"), Some("$7.00"));
        assert_eq!(card.field_value("Missing"), None);
    }

    #[test]
    fn reply_accessors() {
        let reply = Reply::Private(Card::new("p", ""));
        assert_eq!(reply.card().map(|c| c.title.as_str()), Some("p"));
        assert!(reply.keyboard().is_none());
        assert!(Reply::Notice("n".into()).card().is_none());
        assert!(Reply::Edit { card: Card::default(), keyboard: vec![] }.keyboard().is_some());
    }
}
