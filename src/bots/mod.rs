use serde::{de::DeserializeOwned, Serialize};
use teloxide::{adaptors::Throttle, Bot};

pub mod shop;

type WrappedBot = Throttle<Bot>;

/// Telegram refuses callback data longer than this
pub const CALLBACK_DATA_LIMIT: usize = 64;

fn make_username(user: &teloxide::types::User) -> String {
    let name = user.first_name.as_str();
    let last_name = user.last_name.as_ref().map(|s| format!(" {}", s)).unwrap_or_default();
    let nick = user.username.as_ref().map(|s| format!(" [@{}]", s)).unwrap_or_default();
    format!("{name}{last_name}{nick}")
}

/// Compact callback payload: postcard bytes in base91
pub trait CallbackMessage: Serialize + DeserializeOwned {
    fn encode(&self) -> anyhow::Result<String> {
        let bytes = postcard::to_allocvec(self)?;
        let data = String::from_utf8(base91::slice_encode(&bytes))?;
        anyhow::ensure!(
            data.len() <= CALLBACK_DATA_LIMIT,
            "callback data is {} bytes long",
            data.len()
        );
        Ok(data)
    }
    fn decode(data: &str) -> anyhow::Result<Self> {
        let bytes = base91::slice_decode(data.as_bytes());
        Ok(postcard::from_bytes(&bytes)?)
    }
}
