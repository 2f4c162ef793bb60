//! Visibility and ownership rules.
//!
//! Every read and write path goes through these predicates. They are pure
//! functions of an entity snapshot, the viewer and the current instant;
//! nothing here touches storage or HTTP.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{category::Category, comment::Comment, post::Post},
};

/// The identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub is_superuser: bool,
}

/// True iff the post is published, its category (if any) is published,
/// and its publication instant has passed.
pub fn is_publicly_visible(post: &Post, now: DateTime<Utc>) -> bool {
    post.is_published && post.category_is_published.unwrap_or(true) && post.pub_date <= now
}

pub fn is_author(post: &Post, viewer: Option<&Actor>) -> bool {
    viewer.is_some_and(|actor| actor.id == post.author_id)
}

/// Authors always see their own posts; everyone else sees only public ones.
pub fn can_view_post(post: &Post, viewer: Option<&Actor>, now: DateTime<Utc>) -> bool {
    is_author(post, viewer) || is_publicly_visible(post, now)
}

pub fn can_view_category(category: &Category) -> bool {
    category.is_published
}

pub fn can_mutate_post(post: &Post, actor: &Actor) -> bool {
    actor.id == post.author_id
}

pub fn can_delete_post(post: &Post, actor: &Actor) -> bool {
    actor.id == post.author_id || actor.is_superuser
}

pub fn can_mutate_comment(comment: &Comment, actor: &Actor) -> bool {
    actor.id == comment.author_id
}

/// Commenting requires the same access as reading the post.
pub fn can_comment(post: &Post, actor: &Actor, now: DateTime<Utc>) -> bool {
    can_view_post(post, Some(actor), now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Edit,
    Delete,
    Comment,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Post(&'a Post),
    /// A comment together with the post it belongs to.
    Comment { post: &'a Post, comment: &'a Comment },
    Category(&'a Category),
}

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Bounce the actor to a view they may see.
    DenyAsRedirect,
    /// Indistinguishable from the resource not existing.
    DenyAsNotFound,
}

impl Decision {
    /// Turns a denial into the matching `AppError`.
    pub fn require(self, not_found: &str, redirect_to: impl FnOnce() -> String) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::DenyAsRedirect => Err(AppError::Redirect(redirect_to())),
            Decision::DenyAsNotFound => Err(AppError::NotFound(not_found.to_string())),
        }
    }
}

fn allow_if(condition: bool, otherwise: Decision) -> Decision {
    if condition { Decision::Allow } else { otherwise }
}

/// A denied write on a post the actor cannot see must look like a missing post.
fn deny_write(post: &Post, actor: Option<&Actor>, now: DateTime<Utc>) -> Decision {
    if can_view_post(post, actor, now) {
        Decision::DenyAsRedirect
    } else {
        Decision::DenyAsNotFound
    }
}

pub fn authorize(
    actor: Option<&Actor>,
    resource: Resource<'_>,
    action: Action,
    now: DateTime<Utc>,
) -> Decision {
    match (resource, action) {
        (Resource::Post(post), Action::View) => {
            allow_if(can_view_post(post, actor, now), Decision::DenyAsNotFound)
        }
        (Resource::Post(post), Action::Comment) => allow_if(
            actor.is_some_and(|a| can_comment(post, a, now)),
            Decision::DenyAsNotFound,
        ),
        (Resource::Post(post), Action::Edit) => allow_if(
            actor.is_some_and(|a| can_mutate_post(post, a)),
            deny_write(post, actor, now),
        ),
        // Superusers may delete posts they cannot see.
        (Resource::Post(post), Action::Delete) => allow_if(
            actor.is_some_and(|a| can_delete_post(post, a)),
            deny_write(post, actor, now),
        ),

        (Resource::Comment { post, comment }, Action::Edit | Action::Delete) => allow_if(
            can_view_post(post, actor, now) && actor.is_some_and(|a| can_mutate_comment(comment, a)),
            deny_write(post, actor, now),
        ),

        (Resource::Category(category), Action::View) => {
            allow_if(can_view_category(category), Decision::DenyAsNotFound)
        }

        // No other combination is granted.
        _ => Decision::DenyAsNotFound,
    }
}
