use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

/// Internationalization service using Fluent (thread-safe)
pub struct I18n {
    bundles: RwLock<HashMap<String, FluentBundle<FluentResource>>>,
    default_locale: String,
}

impl I18n {
    /// Create a new i18n service with embedded English translations
    pub fn new() -> Self {
        let i18n = Self {
            bundles: RwLock::new(HashMap::new()),
            default_locale: "en".to_string(),
        };

        i18n.load_embedded_en();

        i18n
    }

    /// Add a locale with translations
    pub fn add_locale(&self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Chat text is plain; skip bidi isolation marks around placeables
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        let mut bundles = self.bundles.write().unwrap_or_else(PoisonError::into_inner);
        bundles.insert(locale.to_string(), bundle);

        debug!(locale = %locale, "Loaded translations");

        Ok(())
    }

    /// Get a translated message
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        // Try requested locale, fall back to default, fall back to key
        self.try_get(locale, key, args)
            .or_else(|| self.try_get(&self.default_locale, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    /// Try to get a translation from a specific locale
    fn try_get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);
        let bundle = bundles.get(locale)?;
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut errors = vec![];
        let result = bundle.format_pattern(pattern, args, &mut errors);

        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(result.to_string())
    }

    /// Get a translated message with arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(locale, key, Some(&fluent_args))
    }

    /// Load embedded English translations
    fn load_embedded_en(&self) {
        let en_translations = r#"
# GreenITE Service - English Translations

# Errors
error-invalid-credentials = Invalid credentials
error-account-locked = Account temporarily locked due to multiple failed attempts
error-rate-limited = Too many login attempts. Please try again later.
error-email-invalid = Please enter a valid email address
error-password-short = Password must be at least { $min } characters
error-not-authenticated = Please log in to chat with Greenie
error-internal = An internal error occurred

# Auth
auth-login-success = Login successful!
auth-logged-out = You have been logged out
auth-session-expired = Your session has expired. Please log in again.

# Chat
chat-thinking = Greenie is thinking...
chat-greeting = Hello there! 👋 I'm Greenie, your sustainability assistant! I'm here to help you learn about eco-friendly practices, energy conservation, waste reduction, and more. What would you like to know about sustainability today?
chat-thanks = You're very welcome! 😊 I'm glad I could help. Remember, every small action towards sustainability makes a difference. Keep up the great work! 🌱
chat-general = 🌱 Sustainability is about meeting our needs without compromising future generations! It covers energy, waste, water, transport, and climate action. What specific area interests you most? I can provide detailed tips and information!
chat-menu-intro = 🤔 I specialize in sustainability topics! Try asking me about:
chat-menu-energy = ⚡ Energy conservation
chat-menu-waste = ♻️ Waste reduction
chat-menu-transport = 🚲 Sustainable transport
chat-menu-water = 💧 Water conservation
chat-menu-climate = 🌍 Climate action
chat-menu-outro = What would you like to explore?

chat-follow-up-1 = 💡 Want to learn more? Ask me about other sustainability topics!
chat-follow-up-2 = 🎯 Ready to take action? Check out the Play section to log your eco-friendly activities!
chat-follow-up-3 = 🏆 Don't forget to track your progress in the Badges section!

topic-energy-1 = ⚡ Great question about energy! Singapore is investing heavily in solar energy and aims to deploy 2GW of solar by 2030. You can reduce energy consumption by using LED lights and energy-efficient appliances!
topic-energy-2 = 🔋 Renewable energy is the future! Did you know Singapore has one of the world's largest floating solar farms? Consider switching to green energy plans from your utility provider.
topic-energy-3 = 💡 Energy efficiency tip: Unplug devices when not in use - they can consume up to 10% of your electricity even when off!

topic-waste-1 = ♻️ Waste reduction is crucial! Singapore aims to become a zero-waste nation. Start with the 3Rs: Reduce, Reuse, Recycle. Did you know we can recycle e-waste at community centers?
topic-waste-2 = 🗂️ Plastic waste is a major concern. Try using reusable bags, bottles, and containers. Singapore has over 600 recycling bins island-wide!
topic-waste-3 = 🌍 Food waste makes up about 10% of total waste in Singapore. Plan your meals and compost organic waste to make a difference!

topic-transport-1 = 🚲 Sustainable transport is key to reducing carbon emissions! Singapore's public transport system is one of the world's best. Try cycling or walking for short distances.
topic-transport-2 = 🚌 Using public transport can reduce your carbon footprint by up to 45%! Singapore is also introducing more electric buses and expanding the rail network.
topic-transport-3 = 🚗 If you must drive, consider carpooling or electric vehicles. Singapore offers incentives for EV adoption and has expanding charging infrastructure!

topic-water-1 = 💧 Water is precious in Singapore! We have the Four National Taps strategy. Simple actions like shorter showers and fixing leaks can save significant water.
topic-water-2 = 🌧️ Rainwater harvesting and NEWater are part of Singapore's water sustainability. You can install water-efficient fixtures to reduce consumption by 30%!
topic-water-3 = 🚿 Water-saving tip: A 5-minute shower uses about 50 liters of water. Try timing your showers and using water-efficient showerheads!

topic-climate-1 = 🌡️ Climate change is real and urgent! Singapore aims to achieve net-zero emissions by 2050. Every action counts - from energy conservation to sustainable choices.
topic-climate-2 = 🌍 Carbon footprint reduction starts with you! Track your emissions, choose sustainable products, and support green businesses. Small changes make big impacts!
topic-climate-3 = 🌿 Singapore's Green Plan 2030 outlines our sustainability roadmap. You can contribute by adopting eco-friendly habits and supporting green initiatives!

# Health
health-status-healthy = Service is healthy
"#;

        if let Err(e) = self.add_locale("en", en_translations) {
            warn!(error = %e, "Failed to load embedded English translations");
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}
