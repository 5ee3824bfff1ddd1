//! Group-scoped access policy.
//!
//! Creation is a hard gate: the target group must be one of the requester's
//! groups. Reads are filtered: an item is visible when its group is one of
//! the requester's groups *and* the requester either owns it or it is public.
//! Private items are therefore hidden from other members of the same group.

use crate::models::{GroupScoped, identity::GroupSet};

/// Whether an identity with `groups` may create a resource in `target_group`.
pub fn may_create(groups: &GroupSet, target_group: i64) -> bool {
    groups.contains(&target_group)
}

/// Whether `item` is visible to `requester`, whose memberships are `groups`.
pub fn is_visible<R: GroupScoped + ?Sized>(requester: &str, groups: &GroupSet, item: &R) -> bool {
    groups.contains(&item.group_id()) && (item.owner_email() == requester || item.is_public())
}

/// Case-insensitive substring match used by search.
pub fn name_matches(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.to_lowercase())
}

/// Keep only the items visible to `requester`, preserving order.
pub fn retain_visible<R: GroupScoped>(requester: &str, groups: &GroupSet, items: &mut Vec<R>) {
    items.retain(|item| is_visible(requester, groups, item));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        group: i64,
        owner: &'static str,
        public: bool,
    }

    impl GroupScoped for Item {
        fn group_id(&self) -> i64 {
            self.group
        }

        fn owner_email(&self) -> &str {
            self.owner
        }

        fn is_public(&self) -> bool {
            self.public
        }
    }

    #[test]
    fn create_requires_membership() {
        let groups = GroupSet::from([1, 2]);
        assert!(may_create(&groups, 1));
        assert!(may_create(&groups, 2));
        assert!(!may_create(&groups, 3));
        assert!(!may_create(&GroupSet::new(), 1));
    }

    #[test]
    fn private_item_visible_only_to_owner() {
        let item = Item {
            group: 5,
            owner: "a@x.com",
            public: false,
        };
        let groups = GroupSet::from([5]);
        assert!(is_visible("a@x.com", &groups, &item));
        assert!(!is_visible("b@x.com", &groups, &item));
    }

    #[test]
    fn public_item_visible_to_group_members_only() {
        let item = Item {
            group: 5,
            owner: "a@x.com",
            public: true,
        };
        assert!(is_visible("b@x.com", &GroupSet::from([5]), &item));
        assert!(!is_visible("c@x.com", &GroupSet::from([6]), &item));
    }

    #[test]
    fn owner_outside_group_cannot_see_own_item() {
        let item = Item {
            group: 5,
            owner: "a@x.com",
            public: false,
        };
        assert!(!is_visible("a@x.com", &GroupSet::from([1]), &item));
    }

    #[test]
    fn name_match_ignores_case() {
        assert!(name_matches("Research Papers", "paper"));
        assert!(name_matches("draft.PDF", "Pdf"));
        assert!(name_matches("anything", ""));
        assert!(!name_matches("notes", "papers"));
    }

    #[test]
    fn retain_visible_keeps_order() {
        let mut items = vec![
            Item { group: 1, owner: "a@x.com", public: true },
            Item { group: 1, owner: "b@x.com", public: false },
            Item { group: 1, owner: "a@x.com", public: false },
            Item { group: 2, owner: "a@x.com", public: true },
        ];
        retain_visible("a@x.com", &GroupSet::from([1]), &mut items);
        let owners: Vec<_> = items.iter().map(|i| (i.owner, i.public)).collect();
        assert_eq!(owners, vec![("a@x.com", true), ("a@x.com", false)]);
    }
}
