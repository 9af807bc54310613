use tracing::{trace, warn};
use twilight_model::gateway::payload::incoming::{MemberAdd, MemberChunk, MemberRemove, MemberUpdate};

use crate::events::ShardContext;

pub fn on_member_add(add: MemberAdd, context: &ShardContext) {
    trace!("Member {} joined {}", add.member.user.id, add.guild_id);
    if let Some(member) = context.cache.add_member(&add.guild_id, &add.member) {
        context.events.member_add(&member);
    }
}

pub fn on_member_remove(remove: MemberRemove, context: &ShardContext) {
    trace!("User {} left {}", remove.user.id, remove.guild_id);
    let Some(guild) = context.cache.get_guild(&remove.guild_id) else {
        warn!("Got a member remove event for an uncached guild: {}", remove.guild_id);
        return;
    };
    if let Some(removed) = context.cache.remove_member(&remove.guild_id, &remove.user) {
        context.events.member_remove(&guild, &removed);
    }
}

pub fn on_member_update(update: MemberUpdate, context: &ShardContext) {
    trace!("Member {} updated on guild {}", update.user.id, update.guild_id);
    let Some((new, old)) = context.cache.update_member(&update) else {
        return;
    };

    // no cached member means we can't tell, treat it as not having had a nickname
    let old_nickname = old.as_ref().and_then(|old| old.nickname.clone());
    if old_nickname != new.nickname {
        context.events.nickname_update(&new, old_nickname.as_deref());
    }

    let old_roles = old.as_ref().map(|old| old.roles.as_slice()).unwrap_or_default();
    for role_id in old_roles.iter().filter(|role_id| !new.roles.contains(role_id)) {
        context.events.role_lost(&new, *role_id);
    }
    for role_id in new.roles.iter().filter(|role_id| !old_roles.contains(role_id)) {
        context.events.role_gained(&new, *role_id);
    }

    context.events.member_update(&new, old.as_ref());
}

pub fn on_member_chunk(chunk: MemberChunk, context: &ShardContext) {
    trace!(
        "Received chunk {}/{} for guild {} with {} members",
        chunk.chunk_index + 1,
        chunk.chunk_count,
        chunk.guild_id,
        chunk.members.len()
    );
    let Some(guild) = context.cache.get_guild(&chunk.guild_id) else {
        warn!("Got a member chunk for guild {} but no such guild exists in the cache!", chunk.guild_id);
        return;
    };
    if let Some(members) = context.cache.chunk_members(&chunk.guild_id, &chunk.members) {
        context.events.members_chunk(&guild, &members);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::cache::test_util;
    use crate::events::test_util::{context, dispatch};
    use crate::util::markers::{GuildId, RoleId, UserId};

    fn update(roles: &[u64], nick: Option<&str>) -> serde_json::Value {
        json!({
            "guild_id": "10",
            "user": test_util::user(2, "user2"),
            "roles": roles.iter().map(|role| role.to_string()).collect::<Vec<_>>(),
            "nick": nick,
            "joined_at": "2021-01-01T00:00:00+00:00",
        })
    }

    #[test]
    fn role_diff_partitions_the_difference() {
        let (context, recorder) = context();
        context.cache.create_guild(test_util::guild(vec![test_util::member(2, &[40, 41, 42])]));

        dispatch(&context, "GUILD_MEMBER_UPDATE", update(&[43, 41, 44], None));
        assert_eq!(
            recorder.take(),
            vec![
                "role_lost 40",
                "role_lost 42",
                "role_gained 43",
                "role_gained 44",
                "member_update 2 true"
            ]
        );

        let member = context.cache.get_member(&GuildId::new(10), &UserId::new(2)).unwrap();
        assert_eq!(member.roles, vec![RoleId::new(43), RoleId::new(41), RoleId::new(44)]);
    }

    #[test]
    fn nickname_only_fires_on_change() {
        let (context, recorder) = context();
        context.cache.create_guild(test_util::guild(vec![test_util::member(2, &[])]));

        dispatch(&context, "GUILD_MEMBER_UPDATE", update(&[], Some("cog")));
        dispatch(&context, "GUILD_MEMBER_UPDATE", update(&[], Some("cog")));
        assert_eq!(
            recorder.take(),
            vec![
                "nickname_update None -> Some(\"cog\")",
                "member_update 2 true",
                "member_update 2 true"
            ]
        );
    }

    #[test]
    fn update_without_cached_member() {
        let (context, recorder) = context();
        context.cache.create_guild(test_util::guild(vec![]));

        dispatch(&context, "GUILD_MEMBER_UPDATE", update(&[40], None));
        assert_eq!(recorder.take(), vec!["role_gained 40", "member_update 2 false"]);
        assert!(context.cache.get_member(&GuildId::new(10), &UserId::new(2)).is_some());
    }

    #[test]
    fn add_remove_and_chunk() {
        let (context, recorder) = context();
        context.cache.create_guild(test_util::guild(vec![]));

        let mut add = test_util::member(2, &[]);
        add["guild_id"] = json!("10");
        dispatch(&context, "GUILD_MEMBER_ADD", add);
        dispatch(
            &context,
            "GUILD_MEMBER_REMOVE",
            json!({"guild_id": "10", "user": test_util::user(2, "user2")}),
        );
        dispatch(
            &context,
            "GUILD_MEMBER_REMOVE",
            json!({"guild_id": "10", "user": test_util::user(3, "stranger")}),
        );
        dispatch(
            &context,
            "GUILD_MEMBERS_CHUNK",
            json!({
                "guild_id": "10",
                "members": [test_util::member(4, &[]), test_util::member(5, &[])],
                "chunk_index": 0,
                "chunk_count": 1
            }),
        );

        assert_eq!(
            recorder.take(),
            vec![
                "member_add 2",
                "member_remove 2 true",
                "member_remove 3 false",
                "members_chunk 10 2"
            ]
        );
        let guild = context.cache.get_guild(&GuildId::new(10)).unwrap();
        assert_eq!(guild.member_count(), 0);
        assert_eq!(guild.cached_member_count(), 2);
    }

    #[test]
    fn events_for_uncached_guilds_are_dropped() {
        let (context, recorder) = context();
        let mut add = test_util::member(2, &[]);
        add["guild_id"] = json!("10");
        dispatch(&context, "GUILD_MEMBER_ADD", add);
        dispatch(&context, "GUILD_MEMBER_UPDATE", update(&[40], None));
        dispatch(
            &context,
            "GUILD_MEMBER_REMOVE",
            json!({"guild_id": "10", "user": test_util::user(2, "user2")}),
        );
        assert!(recorder.take().is_empty());
    }
}
