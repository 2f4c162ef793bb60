//! Feed listing: the home page, a category page and a profile page.
//!
//! A request is turned into a [`PostQuery`] which the repository evaluates.
//! The in-memory repository evaluates it with [`PostQuery::matches`] and
//! [`sort_posts`]; the Postgres one translates it to SQL with the same meaning.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::{
    config::POSTS_PER_PAGE,
    error::AppError,
    models::{
        category::Category,
        post::{Post, PostPage},
        user::PublicProfile,
    },
    policy::{self, Action, Actor, Resource},
    repository::BlogRepository,
};

/// Which posts a list is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    Home,
    Category { category_id: i64 },
    Profile { author_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Only posts passing [`policy::is_publicly_visible`].
    PublicOnly,
    /// Drafts, scheduled and delisted posts included.
    Everything,
}

/// `pub_date` descending, then id descending so pages never shuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    PubDateDesc,
}

fn invalid_page() -> AppError {
    AppError::field("page", "invalid_page", "Page must be a positive integer.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>) -> Result<Self, AppError> {
        match page.unwrap_or(1) {
            0 => Err(invalid_page()),
            page => Ok(Self { page }),
        }
    }

    /// Parses the raw `page` query value. Anything but a positive integer
    /// is a validation error on the `page` field.
    pub fn from_query(raw: Option<&str>) -> Result<Self, AppError> {
        let page = raw
            .map(|value| value.trim().parse::<u32>().map_err(|_| invalid_page()))
            .transpose()?;
        Self::new(page)
    }

    pub fn limit(&self) -> u32 {
        POSTS_PER_PAGE
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(POSTS_PER_PAGE)
    }
}

/// Everything the repository needs to produce one page of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub scope: FeedScope,
    pub visibility: VisibilityFilter,
    pub sort: SortKey,
    pub page: PageRequest,
    pub now: DateTime<Utc>,
}

impl PostQuery {
    /// Self-view of a profile lifts the visibility filter. Every other
    /// combination of scope and viewer applies it.
    pub fn for_viewer(
        scope: FeedScope,
        viewer: Option<&Actor>,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> Self {
        let visibility = match (scope, viewer) {
            (FeedScope::Profile { author_id }, Some(actor)) if actor.id == author_id => {
                VisibilityFilter::Everything
            }
            _ => VisibilityFilter::PublicOnly,
        };

        Self {
            scope,
            visibility,
            sort: SortKey::default(),
            page,
            now,
        }
    }

    /// Scope and visibility filter, ignoring pagination.
    pub fn matches(&self, post: &Post) -> bool {
        let in_scope = match self.scope {
            FeedScope::Home => true,
            FeedScope::Category { category_id } => post.category_id == Some(category_id),
            FeedScope::Profile { author_id } => post.author_id == author_id,
        };

        in_scope
            && match self.visibility {
                VisibilityFilter::PublicOnly => policy::is_publicly_visible(post, self.now),
                VisibilityFilter::Everything => true,
            }
    }
}

pub fn compare_posts(a: &Post, b: &Post, sort: SortKey) -> Ordering {
    match sort {
        SortKey::PubDateDesc => b.pub_date.cmp(&a.pub_date).then_with(|| b.id.cmp(&a.id)),
    }
}

pub fn sort_posts(posts: &mut [Post], sort: SortKey) {
    posts.sort_by(|a, b| compare_posts(a, b, sort));
}

impl PostPage {
    /// A page past the end is not found, except the first page of an empty feed.
    pub fn assemble(items: Vec<Post>, request: PageRequest, total_items: u64) -> Result<Self, AppError> {
        let per_page = u64::from(POSTS_PER_PAGE);
        let total_pages = total_items.div_ceil(per_page).max(1);

        if u64::from(request.page) > total_pages {
            return Err(AppError::NotFound("Invalid page".to_string()));
        }

        let total_pages = u32::try_from(total_pages)
            .map_err(|_| AppError::InternalServerError("page count overflow".to_string()))?;

        Ok(Self {
            items,
            page: request.page,
            total_pages,
            total_items,
            has_next: request.page < total_pages,
            has_previous: request.page > 1,
        })
    }
}

/// A list request as it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Home,
    Category(String),
    Profile(String),
}

/// Whose list was requested, alongside the page itself.
#[derive(Debug)]
pub enum FeedOwner {
    Home,
    Category(Category),
    Profile(PublicProfile),
}

#[derive(Debug)]
pub struct Feed {
    pub owner: FeedOwner,
    pub posts: PostPage,
}

/// Resolves the scope, applies the viewer's visibility rule and fetches one page.
///
/// Unknown or unpublished categories and unknown usernames are not found.
pub async fn list_visible_posts(
    repo: &dyn BlogRepository,
    scope: &ListScope,
    viewer: Option<&Actor>,
    now: DateTime<Utc>,
    page: PageRequest,
) -> Result<Feed, AppError> {
    let (owner, feed_scope) = match scope {
        ListScope::Home => (FeedOwner::Home, FeedScope::Home),
        ListScope::Category(slug) => {
            let category = repo
                .find_category_by_slug(slug)
                .await?
                .ok_or(AppError::NotFound("Category not found".to_string()))?;

            policy::authorize(viewer, Resource::Category(&category), Action::View, now)
                .require("Category not found", String::new)?;

            let feed_scope = FeedScope::Category {
                category_id: category.id,
            };
            (FeedOwner::Category(category), feed_scope)
        }
        ListScope::Profile(username) => {
            let user = repo
                .find_user_by_username(username)
                .await?
                .ok_or(AppError::NotFound("User not found".to_string()))?;

            let feed_scope = FeedScope::Profile { author_id: user.id };
            (FeedOwner::Profile(user.into()), feed_scope)
        }
    };

    let query = PostQuery::for_viewer(feed_scope, viewer, now, page);
    let (items, total) = repo.list_posts(&query).await?;
    let posts = PostPage::assemble(items, page, total)?;

    Ok(Feed { owner, posts })
}
