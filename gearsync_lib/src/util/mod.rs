use crate::util::error::GatewayError;
use crate::util::markers::GuildId;

pub mod error;
pub mod markers;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// The shard responsible for a guild, guilds are spread over the shards by the timestamp part of
/// their snowflake.
pub fn shard_for_guild(guild_id: GuildId, total_shards: u64) -> u64 {
    if total_shards == 0 {
        return 0;
    }
    (guild_id.get() >> 22) % total_shards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_shard_assignment() {
        let guild_id = GuildId::new(81384788765712384);
        assert_eq!(shard_for_guild(guild_id, 1), 0);
        assert_eq!(shard_for_guild(guild_id, 16), (81384788765712384u64 >> 22) % 16);
        // same guild always lands on the same shard
        assert_eq!(shard_for_guild(guild_id, 7), shard_for_guild(guild_id, 7));
        assert_eq!(shard_for_guild(guild_id, 0), 0);
    }
}
