//! Export executor: traversal, fan-out and persistence
//!
//! Every level of the hierarchy follows the same pattern: list the children,
//! then for every child concurrently persist its record and descend into it.
//! A level completes once all of its children completed (fan-in), and the
//! first error anywhere aborts the export. Each branch builds and returns
//! its own summary node, so no summary state is shared between tasks.

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::try_join;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::exporter::config::ExportConfig;
use crate::exporter::pagination::{page_params, remaining_offsets, Collection, PageTally, PaginationHelper};
use crate::exporter::rate_limit::RateLimiter;
use crate::exporter::summary::{
    assign_keys, AccountSummary, AppSummary, OrgSummary, Summary, WorkspaceSummary,
};
use crate::exporter::ExportError;
use crate::fetcher::download::{authorized_url, FileDownloader};
use crate::fetcher::{expect_array, parse_records, Method, PodioApi};
use crate::output::path::{
    child_dir, download_filename, page_filename, record_filename, FILES_DIRNAME, SUMMARY_FILENAME,
};
use crate::output::{persist_json, ExportPaths, OutputError};
use crate::{Application, FileEntry, ItemPage, Organization, Workspace};

/// Raised when item totals change between pages
const ITEMS_CHANGED_MESSAGE: &str = "Items might have been created/deleted while exporting. Aborting!";

/// Export executor orchestrates one account export
pub struct ExportExecutor {
    api: Arc<dyn PodioApi>,
    downloader: Arc<dyn FileDownloader>,
    rate_limiter: Arc<RateLimiter>,
    config: ExportConfig,
    paths: ExportPaths,
}

impl ExportExecutor {
    /// Create an executor writing below `export_root`
    ///
    /// The rate limiter is sized from `config.rate_limit`.
    pub fn new(
        api: Arc<dyn PodioApi>,
        downloader: Arc<dyn FileDownloader>,
        config: ExportConfig,
        export_root: impl Into<PathBuf>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::per_hour(config.rate_limit));
        Self {
            api,
            downloader,
            rate_limiter,
            config,
            paths: ExportPaths::new(export_root),
        }
    }

    /// Share an existing rate limiter instead of creating one
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Options in effect
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Directory an account is exported to
    pub fn account_dir(&self, username: &str) -> PathBuf {
        self.paths.account_dir(username)
    }

    /// Export everything visible to `username`
    ///
    /// Organizations are exported concurrently; contacts follow once every
    /// organization is done. The summary is written to `summary.json` before
    /// it is validated, so a failed validation still leaves the report on disk.
    ///
    /// # Errors
    /// The first failure of any branch, or [`ExportError::Validation`] naming
    /// the first incomplete application.
    pub async fn export_account(&self, username: &str) -> Result<Summary, ExportError> {
        self.config.validate()?;

        let account_dir = self.paths.account_dir(username);
        info!(
            username,
            directory = %account_dir.display(),
            downloads = self.config.should_download_files,
            "Starting export"
        );

        let orgs: Vec<(Organization, Value)> =
            parse_records(self.request(Method::Get, "/org/", None).await?)?;
        let keys = assign_keys(orgs.iter().map(|(org, _)| (org.name.as_str(), org.org_id)));

        let organizations: BTreeMap<String, OrgSummary> = try_join_all(
            orgs.iter()
                .zip(keys)
                .map(|((org, raw), key)| self.export_organization(org, raw, key, &account_dir)),
        )
        .await?
        .into_iter()
        .collect();

        let num_contacts = self.export_contacts(&account_dir).await?;

        let summary = Summary::new(
            username,
            AccountSummary {
                organizations,
                num_contacts,
            },
        );
        self.persist(&account_dir, SUMMARY_FILENAME, &summary).await?;

        if let Err(source) = summary.check_completeness(self.config.should_download_files) {
            error!("{}", source);
            return Err(ExportError::Validation {
                source,
                summary: Box::new(summary),
            });
        }

        info!(
            username,
            organizations = summary.account.organizations.len(),
            applications = summary.applications().count(),
            contacts = summary.account.num_contacts,
            "Export completed"
        );
        Ok(summary)
    }

    async fn export_organization(
        &self,
        org: &Organization,
        raw: &Value,
        key: String,
        account_dir: &Path,
    ) -> Result<(String, OrgSummary), ExportError> {
        let org_dir = child_dir(account_dir, &key);
        let record = record_filename(&key);
        info!(org = %key, org_id = org.org_id, "Exporting organization");

        let ((), num_tasks, workspaces) = try_join!(
            self.persist(&org_dir, &record, raw),
            self.export_tasks(org.org_id, &org_dir),
            self.export_workspaces(org.org_id, &org_dir),
        )?;

        Ok((
            key,
            OrgSummary {
                num_tasks,
                workspaces,
            },
        ))
    }

    async fn export_workspaces(
        &self,
        org_id: u64,
        org_dir: &Path,
    ) -> Result<BTreeMap<String, WorkspaceSummary>, ExportError> {
        let path = format!("/space/org/{org_id}/");
        let spaces: Vec<(Workspace, Value)> =
            parse_records(self.request(Method::Get, &path, None).await?)?;
        let keys = assign_keys(spaces.iter().map(|(space, _)| (space.name.as_str(), space.space_id)));

        let workspaces = try_join_all(
            spaces
                .iter()
                .zip(keys)
                .map(|((space, raw), key)| self.export_workspace(space, raw, key, org_dir)),
        )
        .await?;

        Ok(workspaces.into_iter().collect())
    }

    async fn export_workspace(
        &self,
        space: &Workspace,
        raw: &Value,
        key: String,
        org_dir: &Path,
    ) -> Result<(String, WorkspaceSummary), ExportError> {
        let space_dir = child_dir(org_dir, &key);
        let record = record_filename(&key);
        debug!(workspace = %key, space_id = space.space_id, "Exporting workspace");

        let ((), apps) = try_join!(
            self.persist(&space_dir, &record, raw),
            self.export_applications(space.space_id, &space_dir),
        )?;

        Ok((key, WorkspaceSummary { apps }))
    }

    async fn export_applications(
        &self,
        space_id: u64,
        space_dir: &Path,
    ) -> Result<BTreeMap<String, AppSummary>, ExportError> {
        let path = format!("/app/space/{space_id}/");
        let apps: Vec<(Application, Value)> =
            parse_records(self.request(Method::Get, &path, None).await?)?;
        let keys = assign_keys(apps.iter().map(|(app, _)| (app.name(), app.app_id)));

        let apps = try_join_all(
            apps.iter()
                .zip(keys)
                .map(|((app, raw), key)| self.export_application(app, raw, key, space_dir)),
        )
        .await?;

        Ok(apps.into_iter().collect())
    }

    async fn export_application(
        &self,
        app: &Application,
        raw: &Value,
        key: String,
        space_dir: &Path,
    ) -> Result<(String, AppSummary), ExportError> {
        let app_dir = child_dir(space_dir, &key);
        let record = record_filename(&key);
        debug!(app = %key, app_id = app.app_id, "Exporting application");

        let ((), (num_items, total_items), files, ()) = try_join!(
            self.persist(&app_dir, &record, raw),
            self.export_items(app.app_id, &app_dir),
            self.export_files(app.app_id, &app_dir),
            self.export_xlsx(app.app_id, &key, &app_dir),
        )?;

        info!(
            app = %key,
            items = num_items,
            total_items,
            files = files.records,
            downloaded = files.downloaded,
            "Application exported"
        );

        Ok((
            key,
            AppSummary {
                num_files: files.records,
                downloaded_files: files.downloaded,
                num_items,
                total_items,
            },
        ))
    }

    /// Export all items of an application, returning `(exported, total)`
    ///
    /// The first page is fetched alone to learn the total; the remaining
    /// pages are fetched with at most `each_limit` requests in flight. A page
    /// reporting a different total aborts the application: no further pages
    /// are requested and the page is not written.
    async fn export_items(&self, app_id: u64, app_dir: &Path) -> Result<(u64, u64), ExportError> {
        let path = format!("/item/app/{app_id}/filter/");
        let limit = self.config.items_limit;

        let (first, raw) = self.fetch_item_page(&path, 0, limit).await?;
        let total = first.total;
        let first_count = first.items.len() as u64;

        if first_count > total {
            warn!(app_id, first_count, total, "First item page exceeds reported total");
            return Err(ExportError::Consistency(format!(
                "Item page of app {app_id} holds {first_count} items but reports a total of {total}"
            )));
        }
        if first_count == 0 {
            return Ok((0, total));
        }
        self.persist(app_dir, &page_filename("items", 0, first_count), &raw)
            .await?;

        let counts: Vec<u64> = stream::iter(remaining_offsets(limit, total))
            .map(|offset| self.export_item_page(&path, offset, limit, total, app_dir))
            .buffer_unordered(self.config.each_limit)
            .try_collect()
            .await?;

        Ok((first_count + counts.iter().sum::<u64>(), total))
    }

    async fn export_item_page(
        &self,
        path: &str,
        offset: u64,
        limit: u64,
        expected_total: u64,
        app_dir: &Path,
    ) -> Result<u64, ExportError> {
        let (page, raw) = self.fetch_item_page(path, offset, limit).await?;

        if page.total != expected_total {
            warn!(
                path,
                offset,
                expected_total,
                reported_total = page.total,
                "Item total changed during export"
            );
            return Err(ExportError::Consistency(ITEMS_CHANGED_MESSAGE.to_string()));
        }

        let count = page.items.len() as u64;
        if count > 0 {
            self.persist(app_dir, &page_filename("items", offset, count), &raw)
                .await?;
        }
        Ok(count)
    }

    async fn fetch_item_page(
        &self,
        path: &str,
        offset: u64,
        limit: u64,
    ) -> Result<(ItemPage, Value), ExportError> {
        let params = page_params(&Default::default(), offset, limit);
        let raw = self.request(Method::Post, path, Some(&params)).await?;
        let page = ItemPage::deserialize(&raw).map_err(|e| {
            crate::fetcher::FetcherError::ParseError(format!("item page of {path}: {e}"))
        })?;
        Ok((page, raw))
    }

    /// Export the tasks of an organization, returning their count
    async fn export_tasks(&self, org_id: u64, org_dir: &Path) -> Result<u64, ExportError> {
        let tasks = Collection::new("tasks", "/task/", self.config.tasks_limit, org_dir)
            .with_param("org", org_id);
        let tally = self.export_collection(&tasks).await?;
        Ok(tally.records)
    }

    /// Export the account's contacts, returning their count
    async fn export_contacts(&self, account_dir: &Path) -> Result<u64, ExportError> {
        let contacts = Collection::new("contacts", "/contact/", self.config.contacts_limit, account_dir);
        let tally = self.export_collection(&contacts).await?;
        Ok(tally.records)
    }

    /// Export the file entries of an application and, when enabled, the
    /// files themselves
    async fn export_files(&self, app_id: u64, app_dir: &Path) -> Result<PageTally, ExportError> {
        let files = Collection::new(
            "files",
            format!("/file/app/{app_id}/"),
            self.config.files_limit,
            app_dir,
        );

        PaginationHelper::paginate(files.limit, |offset| self.export_files_page(&files, offset)).await
    }

    async fn export_files_page(
        &self,
        files: &Collection<'_>,
        offset: u64,
    ) -> Result<PageTally, ExportError> {
        let records = self.fetch_records(files, offset).await?;
        let count = records.len() as u64;
        if count == 0 {
            return Ok(PageTally::default());
        }

        let filename = page_filename(files.prefix, offset, count);
        let ((), downloaded) = try_join!(
            self.persist(files.directory, &filename, &records),
            self.download_files(&records, files.directory),
        )?;

        Ok(PageTally {
            records: count,
            downloaded,
        })
    }

    async fn download_files(&self, records: &[Value], app_dir: &Path) -> Result<u64, ExportError> {
        if !self.config.should_download_files {
            return Ok(0);
        }

        let entries = records
            .iter()
            .map(|raw| {
                FileEntry::deserialize(raw).map_err(|e| {
                    crate::fetcher::FetcherError::ParseError(format!("file entry {raw}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let files_dir = app_dir.join(FILES_DIRNAME);
        ensure_dir(&files_dir).await?;

        let downloaded: Vec<()> = stream::iter(entries.iter())
            .map(|entry| self.download_file(entry, &files_dir))
            .buffer_unordered(self.config.each_limit)
            .try_collect()
            .await?;

        Ok(downloaded.len() as u64)
    }

    async fn download_file(&self, entry: &FileEntry, files_dir: &Path) -> Result<(), ExportError> {
        let destination = files_dir.join(download_filename(entry.file_id, &entry.mimetype));
        let url = authorized_url(&entry.link, self.api.access_token());
        self.download(&url, &destination).await
    }

    /// Download the application's items as a spreadsheet, when enabled
    async fn export_xlsx(&self, app_id: u64, key: &str, app_dir: &Path) -> Result<(), ExportError> {
        if !self.config.should_download_xlsx {
            return Ok(());
        }

        ensure_dir(app_dir).await?;
        let link = format!("{}/item/app/{app_id}/xlsx/", self.api.base_url());
        let url = authorized_url(&link, self.api.access_token());
        let destination = app_dir.join(format!("{}.xlsx", crate::output::sanitize_segment(key)));
        self.download(&url, &destination).await
    }

    /// Sequentially export a collection of plain JSON arrays
    async fn export_collection(&self, collection: &Collection<'_>) -> Result<PageTally, ExportError> {
        PaginationHelper::paginate(collection.limit, |offset| {
            self.export_records_page(collection, offset)
        })
        .await
    }

    async fn export_records_page(
        &self,
        collection: &Collection<'_>,
        offset: u64,
    ) -> Result<PageTally, ExportError> {
        let records = self.fetch_records(collection, offset).await?;
        let count = records.len() as u64;
        if count > 0 {
            let filename = page_filename(collection.prefix, offset, count);
            self.persist(collection.directory, &filename, &records).await?;
        }
        Ok(PageTally::records(count))
    }

    async fn fetch_records(
        &self,
        collection: &Collection<'_>,
        offset: u64,
    ) -> Result<Vec<Value>, ExportError> {
        let params = collection.page_params(offset);
        let response = self
            .request(Method::Get, &collection.path, Some(&params))
            .await?;
        Ok(expect_array(response)?)
    }

    /// Rate-limited API request
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Value>,
    ) -> Result<Value, ExportError> {
        self.rate_limiter.acquire(1).await?;
        Ok(self.api.request(method, path, params).await?)
    }

    /// Rate-limited download
    async fn download(&self, url: &str, destination: &Path) -> Result<(), ExportError> {
        self.rate_limiter.acquire(1).await?;
        Ok(self.downloader.download(url, destination).await?)
    }

    async fn persist<T: Serialize + ?Sized + Sync>(
        &self,
        directory: &Path,
        filename: &str,
        value: &T,
    ) -> Result<(), ExportError> {
        Ok(persist_json(directory, filename, value).await?)
    }
}

async fn ensure_dir(directory: &Path) -> Result<(), ExportError> {
    tokio::fs::create_dir_all(directory).await.map_err(|e| {
        ExportError::Output(OutputError::IoError(format!(
            "Failed to create directory {}: {e}",
            directory.display()
        )))
    })
}
