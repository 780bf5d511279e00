pub const CURRENCY: &str = "Robux";

pub const GIFTABLE_YES: &str = "✅ Yes, Giftable";
pub const GIFTABLE_NO: &str = "❌ No, Not Giftable";
pub const BUY_GIFTABLE_YES: &str = "✅ Yes, Buy Giftable";
pub const BUY_GIFTABLE_NO: &str = "❌ No Thanks";
pub const SHOP_GIFTABLE: &str = "🎁 Buy Giftable Gamepass";
pub const SHOP_CURRENCY: &str = "💎 Buy Robux";

pub const FIELD_RATE: &str = "📊 Current Rate";
pub const FIELD_COST: &str = "💰 USD Cost";
pub const FIELD_CALCULATION: &str = "📊 Calculation";
pub const FIELD_NEXT_STEP: &str = "🎫 Next Step";
pub const FIELD_CHECKLIST: &str = "📝 Bring This Info";
pub const FIELD_TICKETS: &str = "🎫 Ticket Channel";
pub const FIELD_PROBLEM: &str = "⚠️ Problem";

pub const NOT_YOURS: &str = "This button is not for you!";
pub const NOT_A_NUMBER: &str = "❌ Invalid number! Please enter a valid Robux amount (example: 1000)";
pub const NOT_POSITIVE: &str = "❌ Please enter a valid positive number!";
pub const TOO_LARGE: &str = "❌ That amount is too large to price. Please enter a smaller number.";
pub const ADMINS_ONLY: &str = "⛔ Only chat administrators can use this command.";
pub const UNKNOWN_BUTTON: &str = "This button is no longer supported.";
pub const OPEN_PRIVATE_CHAT: &str = "Open a private chat with me and press the button again.";

pub const GIFTABLE_CHECKLIST: &[&str] = &[
    "Link to your giftable gamepass",
    "Robux amount of the gamepass",
    "Your Roblox username",
    "Preferred payment method",
];

pub const CURRENCY_CHECKLIST: &[&str] = &[
    "How many Robux you want",
    "Your Roblox username",
    "Preferred payment method",
];
