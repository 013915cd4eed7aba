use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::data::models::{AppError, Feed, FeedArticle, FeedForm, FeedWithLanguage, NewFeed};
use crate::data::repositories::last_insert_rowid;
use crate::features::feeds::{FeedItem, FeedOptions};
use crate::schema::{feed_articles, feeds, languages};

pub struct FeedRepository;

impl FeedRepository {
    pub fn list_with_language(
        conn: &mut SqliteConnection,
    ) -> Result<Vec<FeedWithLanguage>, AppError> {
        let rows = feeds::table
            .inner_join(languages::table)
            .order_by(feeds::feed_name.asc())
            .select((
                feeds::feed_id,
                feeds::feed_name,
                feeds::source_uri,
                feeds::options,
                languages::lang_name,
                feeds::updated_at,
            ))
            .load::<(i32, String, String, String, String, Option<NaiveDateTime>)>(conn)?
            .into_iter()
            .map(
                |(feed_id, feed_name, source_uri, options, lang_name, updated_at)| {
                    FeedWithLanguage {
                        feed_id,
                        feed_name,
                        source_uri,
                        options,
                        lang_name,
                        updated_at,
                    }
                },
            )
            .collect();
        Ok(rows)
    }

    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<Feed>, AppError> {
        let rows = feeds::table.select(Feed::as_select()).load(conn)?;
        Ok(rows)
    }

    pub fn find(conn: &mut SqliteConnection, feed_id: i32) -> Result<Feed, AppError> {
        feeds::table
            .filter(feeds::feed_id.eq(feed_id))
            .select(Feed::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Feed"))
    }

    pub fn create(conn: &mut SqliteConnection, form: &FeedForm) -> Result<i32, AppError> {
        diesel::insert_into(feeds::table)
            .values(&NewFeed {
                lang_id: form.lang_id,
                feed_name: form.feed_name.trim(),
                source_uri: form.source_uri.trim(),
                section_tags: form.section_tags.trim(),
                filter_tags: form.filter_tags.trim(),
                options: form.options.trim(),
            })
            .execute(conn)?;
        Ok(last_insert_rowid(conn)?)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        feed_id: i32,
        form: &FeedForm,
    ) -> Result<(), AppError> {
        let updated = diesel::update(feeds::table.filter(feeds::feed_id.eq(feed_id)))
            .set((
                feeds::lang_id.eq(form.lang_id),
                feeds::feed_name.eq(form.feed_name.trim()),
                feeds::source_uri.eq(form.source_uri.trim()),
                feeds::section_tags.eq(form.section_tags.trim()),
                feeds::filter_tags.eq(form.filter_tags.trim()),
                feeds::options.eq(form.options.trim()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::NotFound("Feed"));
        }
        Ok(())
    }

    /// Deleting a feed deletes all of its articles with it.
    pub fn delete_cascade(conn: &mut SqliteConnection, feed_id: i32) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::delete(feed_articles::table.filter(feed_articles::feed_id.eq(feed_id)))
                .execute(conn)?;
            let deleted = diesel::delete(feeds::table.filter(feeds::feed_id.eq(feed_id)))
                .execute(conn)?;
            if deleted == 0 {
                return Err(AppError::NotFound("Feed"));
            }
            Ok(())
        })
    }

    pub fn articles(
        conn: &mut SqliteConnection,
        feed_id: i32,
    ) -> Result<Vec<FeedArticle>, AppError> {
        let rows = feed_articles::table
            .filter(feed_articles::feed_id.eq(feed_id))
            .order_by(feed_articles::published.desc())
            .select(FeedArticle::as_select())
            .load(conn)?;
        Ok(rows)
    }

    pub fn find_article(
        conn: &mut SqliteConnection,
        article_id: i32,
    ) -> Result<FeedArticle, AppError> {
        feed_articles::table
            .filter(feed_articles::article_id.eq(article_id))
            .select(FeedArticle::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Article"))
    }

    /// Stores fetched items, keyed by link; already-known links are left
    /// untouched. Returns how many were new.
    pub fn upsert_articles(
        conn: &mut SqliteConnection,
        feed_id: i32,
        items: &[FeedItem],
        max_links: usize,
    ) -> Result<usize, AppError> {
        let mut inserted = 0;
        for item in items.iter().take(max_links) {
            let rows = diesel::insert_into(feed_articles::table)
                .values((
                    feed_articles::feed_id.eq(feed_id),
                    feed_articles::title.eq(&item.title),
                    feed_articles::link.eq(&item.link),
                    feed_articles::description.eq(&item.description),
                    feed_articles::published.eq(item.published),
                ))
                .on_conflict((feed_articles::feed_id, feed_articles::link))
                .do_nothing()
                .execute(conn)?;
            inserted += rows;
        }
        Ok(inserted)
    }

    pub fn mark_imported(
        conn: &mut SqliteConnection,
        article_id: i32,
        text_id: i32,
    ) -> Result<(), AppError> {
        diesel::update(feed_articles::table.filter(feed_articles::article_id.eq(article_id)))
            .set(feed_articles::text_id.eq(Some(text_id)))
            .execute(conn)?;
        Ok(())
    }

    pub fn touch(conn: &mut SqliteConnection, feed_id: i32) -> Result<(), AppError> {
        diesel::update(feeds::table.filter(feeds::feed_id.eq(feed_id)))
            .set(feeds::updated_at.eq(Some(Utc::now().naive_utc())))
            .execute(conn)?;
        Ok(())
    }

    /// Feeds whose autoupdate interval has elapsed (or which were never
    /// fetched at all, when they have one configured).
    pub fn due_for_update(conn: &mut SqliteConnection) -> Result<Vec<Feed>, AppError> {
        let now = Utc::now().naive_utc();
        let due = Self::all(conn)?
            .into_iter()
            .filter(|feed| {
                let Some(interval) = FeedOptions::parse(&feed.options).autoupdate else {
                    return false;
                };
                match feed.updated_at {
                    Some(updated_at) => now - updated_at >= interval,
                    None => true,
                }
            })
            .collect();
        Ok(due)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::repositories::test_support::{create_english, test_conn};

    fn feed_form(lang_id: i32) -> FeedForm {
        FeedForm {
            lang_id,
            feed_name: "News".to_string(),
            source_uri: "https://example.org/rss".to_string(),
            section_tags: String::new(),
            filter_tags: String::new(),
            options: "autoupdate=1h".to_string(),
        }
    }

    fn item(link: &str) -> FeedItem {
        FeedItem {
            title: format!("Article {}", link),
            link: link.to_string(),
            description: "Body".to_string(),
            published: None,
        }
    }

    #[test]
    fn upsert_deduplicates_by_link() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let feed_id = FeedRepository::create(&mut conn, &feed_form(lang_id)).unwrap();

        let items = vec![item("https://example.org/1"), item("https://example.org/2")];
        assert_eq!(
            FeedRepository::upsert_articles(&mut conn, feed_id, &items, 20).unwrap(),
            2
        );
        assert_eq!(
            FeedRepository::upsert_articles(&mut conn, feed_id, &items, 20).unwrap(),
            0
        );
        assert_eq!(FeedRepository::articles(&mut conn, feed_id).unwrap().len(), 2);
    }

    #[test]
    fn max_links_caps_the_batch() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let feed_id = FeedRepository::create(&mut conn, &feed_form(lang_id)).unwrap();

        let items: Vec<FeedItem> = (0..10)
            .map(|i| item(&format!("https://example.org/{}", i)))
            .collect();
        assert_eq!(
            FeedRepository::upsert_articles(&mut conn, feed_id, &items, 3).unwrap(),
            3
        );
    }

    #[test]
    fn deleting_a_feed_deletes_its_articles() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let feed_id = FeedRepository::create(&mut conn, &feed_form(lang_id)).unwrap();
        FeedRepository::upsert_articles(&mut conn, feed_id, &[item("https://example.org/1")], 20)
            .unwrap();

        FeedRepository::delete_cascade(&mut conn, feed_id).unwrap();
        let remaining: i64 = feed_articles::table.count().get_result(&mut conn).unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            FeedRepository::find(&mut conn, feed_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn never_fetched_feeds_with_autoupdate_are_due() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let feed_id = FeedRepository::create(&mut conn, &feed_form(lang_id)).unwrap();

        let due = FeedRepository::due_for_update(&mut conn).unwrap();
        assert_eq!(due.len(), 1);

        FeedRepository::touch(&mut conn, feed_id).unwrap();
        assert!(FeedRepository::due_for_update(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn feeds_without_autoupdate_are_never_due() {
        let mut conn = test_conn();
        let lang_id = create_english(&mut conn);
        let mut form = feed_form(lang_id);
        form.options = String::new();
        FeedRepository::create(&mut conn, &form).unwrap();
        assert!(FeedRepository::due_for_update(&mut conn).unwrap().is_empty());
    }
}
