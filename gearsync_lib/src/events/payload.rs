use serde::de::{Deserializer, Error as DeError};
use serde::Deserialize;
use serde_json::Value;
use twilight_model::guild::{Guild, UnavailableGuild};

/// GUILD_CREATE either carries the full guild or, during an outage, only the unavailable stub.
///
/// twilight's own `GuildCreate` only knows the full guild, so the split happens here. A payload
/// is only taken as a stub when it says `"unavailable": true`, everything else has to decode as
/// a complete guild.
#[derive(Debug, Clone)]
pub enum GuildCreate {
    Available(Box<Guild>),
    Unavailable(UnavailableGuild),
}

impl<'de> Deserialize<'de> for GuildCreate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let unavailable = value
            .get("unavailable")
            .and_then(Value::as_bool)
            .unwrap_or_default();

        if unavailable {
            serde_json::from_value(value)
                .map(GuildCreate::Unavailable)
                .map_err(DeError::custom)
        } else {
            serde_json::from_value(value)
                .map(|guild| GuildCreate::Available(Box::new(guild)))
                .map_err(DeError::custom)
        }
    }
}
