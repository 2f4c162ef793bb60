//! PostgreSQL repository backed by a `PgPool`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    feed::{FeedScope, PostQuery, SortKey, VisibilityFilter},
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        comment::Comment,
        location::{Location, LocationRequest},
        post::{Post, PostInput},
        user::{NewUser, ProfileChanges, User},
    },
    policy::{self, Action, Actor, Resource},
    repository::{BlogRepository, Mutation},
};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password, is_superuser, created_at";

const POST_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.text, p.image, p.pub_date, p.is_published, p.created_at,
        p.author_id, u.username AS author_username,
        p.category_id, c.slug AS category_slug, c.title AS category_title,
        c.is_published AS category_is_published,
        p.location_id, l.name AS location_name,
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.post_id, cm.author_id, u.username AS author_username, cm.text, cm.created_at
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

/// Rewrites a unique violation into a readable conflict message.
fn conflict_or(err: sqlx::Error, message: String) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict(message),
        other => other,
    }
}

async fn fetch_post<'e, E: PgExecutor<'e>>(executor: E, id: i64, lock: bool) -> Result<Option<Post>, AppError> {
    let mut sql = format!("{POST_SELECT} WHERE p.id = $1");
    if lock {
        sql.push_str(" FOR UPDATE OF p");
    }
    let post = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(post)
}

async fn fetch_comment<'e, E: PgExecutor<'e>>(
    executor: E,
    post_id: i64,
    comment_id: i64,
    lock: bool,
) -> Result<Option<Comment>, AppError> {
    let mut sql = format!("{COMMENT_SELECT} WHERE cm.id = $1 AND cm.post_id = $2");
    if lock {
        sql.push_str(" FOR UPDATE OF cm");
    }
    let comment = sqlx::query_as::<_, Comment>(&sql)
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(executor)
        .await?;
    Ok(comment)
}

/// Appends the WHERE clause equivalent to `PostQuery::matches`.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    qb.push(" WHERE TRUE");

    match query.scope {
        FeedScope::Home => {}
        FeedScope::Category { category_id } => {
            qb.push(" AND p.category_id = ").push_bind(category_id);
        }
        FeedScope::Profile { author_id } => {
            qb.push(" AND p.author_id = ").push_bind(author_id);
        }
    }

    if query.visibility == VisibilityFilter::PublicOnly {
        qb.push(" AND p.is_published AND (p.category_id IS NULL OR c.is_published) AND p.pub_date <= ")
            .push_bind(query.now);
    }
}

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlogRepository for PgRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, password, first_name, last_name, email, is_superuser)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(user.is_superuser)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or(e, format!("Username '{}' already exists", user.username)))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET first_name = $1, last_name = $2, email = $3
             WHERE id = $4
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.email)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (title, description, slug, is_published)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, slug, is_published, created_at
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.slug)
        .bind(req.is_published.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, format!("Category slug '{}' already exists", req.slug)))
    }

    async fn find_category_by_id(&self, id: i64) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET title = $1, description = $2, is_published = $3
            WHERE id = $4
            RETURNING id, title, description, slug, is_published, created_at
            "#,
        )
        .bind(req.title)
        .bind(req.description)
        .bind(req.is_published)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        // posts.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_location(&self, req: LocationRequest) -> Result<Location, AppError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (name, is_published)
            VALUES ($1, $2)
            RETURNING id, name, is_published, created_at
            "#,
        )
        .bind(req.name)
        .bind(req.is_published.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;
        Ok(location)
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn update_location(&self, id: i64, req: LocationRequest) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations SET name = $1, is_published = COALESCE($2, is_published)
            WHERE id = $3
            RETURNING id, name, is_published, created_at
            "#,
        )
        .bind(req.name)
        .bind(req.is_published)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn delete_location(&self, id: i64) -> Result<bool, AppError> {
        // posts.location_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, author_id: i64, input: PostInput, now: DateTime<Utc>) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, text, image, pub_date, is_published, created_at, author_id, category_id, location_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(input.title)
        .bind(input.text)
        .bind(input.image)
        .bind(input.pub_date.unwrap_or(now))
        .bind(input.is_published.unwrap_or(true))
        .bind(now)
        .bind(author_id)
        .bind(input.category_id)
        .bind(input.location_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        })?;

        let post = fetch_post(&mut *tx, id, false)
            .await?
            .ok_or(AppError::InternalServerError("created post vanished".to_string()))?;

        tx.commit().await?;
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        fetch_post(&self.pool, id, false).await
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), AppError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id",
        );
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filters(&mut qb, query);
        match query.sort {
            SortKey::PubDateDesc => qb.push(" ORDER BY p.pub_date DESC, p.id DESC"),
        };
        qb.push(" LIMIT ")
            .push_bind(i64::from(query.page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));

        let posts = qb
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::from(e)
            })?;

        Ok((posts, u64::try_from(total).unwrap_or(0)))
    }

    async fn update_post(
        &self,
        id: i64,
        actor: &Actor,
        input: PostInput,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Post>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(post) = fetch_post(&mut *tx, id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Edit, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        sqlx::query(
            r#"
            UPDATE posts SET
                title = $1,
                text = $2,
                image = $3,
                pub_date = COALESCE($4, pub_date),
                is_published = COALESCE($5, is_published),
                category_id = $6,
                location_id = $7
            WHERE id = $8
            "#,
        )
        .bind(input.title)
        .bind(input.text)
        .bind(input.image)
        .bind(input.pub_date)
        .bind(input.is_published)
        .bind(input.category_id)
        .bind(input.location_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = fetch_post(&mut *tx, id, false).await?;
        tx.commit().await?;

        Ok(updated.map_or(Mutation::NotFound, Mutation::Applied))
    }

    async fn delete_post(&self, id: i64, actor: &Actor, now: DateTime<Utc>) -> Result<Mutation<()>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(post) = fetch_post(&mut *tx, id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Delete, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        // comments.post_id is ON DELETE CASCADE
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete post: {:?}", e);
                AppError::from(e)
            })?;

        tx.commit().await?;
        Ok(Mutation::Applied(()))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let sql = format!("{COMMENT_SELECT} WHERE cm.post_id = $1 ORDER BY cm.created_at ASC, cm.id ASC");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError> {
        fetch_comment(&self.pool, post_id, comment_id, false).await
    }

    async fn create_comment(
        &self,
        post_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(post) = fetch_post(&mut *tx, post_id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Comment, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (post_id, author_id, text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(actor.id)
        .bind(text)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let comment = fetch_comment(&mut *tx, post_id, id, false).await?;
        tx.commit().await?;

        Ok(comment.map_or(Mutation::NotFound, Mutation::Applied))
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(post) = fetch_post(&mut *tx, post_id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let Some(comment) = fetch_comment(&mut *tx, post_id, comment_id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(
            Some(actor),
            Resource::Comment { post: &post, comment: &comment },
            Action::Edit,
            now,
        );
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        sqlx::query("UPDATE comments SET text = $1 WHERE id = $2")
            .bind(text)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        let updated = fetch_comment(&mut *tx, post_id, comment_id, false).await?;
        tx.commit().await?;

        Ok(updated.map_or(Mutation::NotFound, Mutation::Applied))
    }

    async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Mutation<()>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(post) = fetch_post(&mut *tx, post_id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let Some(comment) = fetch_comment(&mut *tx, post_id, comment_id, true).await? else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(
            Some(actor),
            Resource::Comment { post: &post, comment: &comment },
            Action::Delete,
            now,
        );
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Mutation::Applied(()))
    }
}
