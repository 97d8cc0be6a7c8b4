//! Release notification document builder

use crate::error::{BuildError, Result};
use crate::ids::IdentifierSource;
use crate::profile::{
    DocumentProfile, AVS_NAMESPACE, ERN_NAMESPACE, MESSAGE_SCHEMA_VERSION, SCHEMA_LOCATION,
    XSI_NAMESPACE,
};
use crate::tree::Element;
use chrono::{DateTime, NaiveDate, Utc};
use courier_core::{BatchContext, MetadataRecord};
use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, info};

const RELEASE_REFERENCE: &str = "R0";
const IMAGE_DETAILS_REFERENCE: &str = "T1";
const ARTIST_ROLE: &str = "MainArtist";

/// A built document and where it was written
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub tree: Element,
    pub path: PathBuf,
}

/// Maps one metadata record to a `NewReleaseMessage`
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    profile: DocumentProfile,
    ids: IdentifierSource,
}

impl DocumentBuilder {
    pub fn new(profile: DocumentProfile) -> Self {
        let ids = IdentifierSource::new(profile.identifiers);
        Self { profile, ids }
    }

    pub fn profile(&self) -> &DocumentProfile {
        &self.profile
    }

    /// Build the document for `record` and write it into its package folder
    ///
    /// The file is written under a temporary name and renamed into place.
    pub fn build(
        &self,
        record: &MetadataRecord,
        image_filename: Option<&str>,
        batch: &BatchContext,
        now: DateTime<Utc>,
    ) -> Result<BuiltDocument> {
        let tree = self.build_tree(record, image_filename, batch.date(), now)?;

        let package_dir = batch.ensure_package_dir(&record.upc)?;
        let file_name = batch.document_file_name(record);
        let path = package_dir.join(&file_name);
        let staging = package_dir.join(format!(".{file_name}.tmp"));

        {
            let file = fs::File::create(&staging)?;
            let mut writer = BufWriter::new(file);
            tree.write_document(&mut writer)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        fs::rename(&staging, &path)?;

        info!(path = %path.display(), upc = %record.upc, "Document written");
        Ok(BuiltDocument { tree, path })
    }

    /// Build the in-memory tree without touching the filesystem
    pub fn build_tree(
        &self,
        record: &MetadataRecord,
        image_filename: Option<&str>,
        release_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Element> {
        require(&record.upc, "upc")?;
        require(&record.isrc, "isrc")?;
        require(&record.title, "title")?;

        let sound_reference = self.ids.resource_reference();
        let image_reference = image_filename.map(|_| {
            let mut reference = self.ids.resource_reference();
            while reference == sound_reference {
                reference = self.ids.resource_reference();
            }
            reference
        });

        let mut resources = Element::new("ResourceList").child(self.sound_recording(record, &sound_reference));
        if let (Some(file), Some(reference)) = (image_filename, image_reference.as_deref()) {
            resources.push(self.image(record, file, reference));
        }

        let root = Element::new("ernm:NewReleaseMessage")
            .attr("xmlns:ernm", ERN_NAMESPACE)
            .attr("xmlns:avs", AVS_NAMESPACE)
            .attr("xmlns:xsi", XSI_NAMESPACE)
            .attr("xsi:schemaLocation", SCHEMA_LOCATION)
            .attr("MessageSchemaVersionId", MESSAGE_SCHEMA_VERSION)
            .attr("LanguageAndScriptCode", &self.profile.language)
            .attr("ReleaseProfileVersionId", &self.profile.release_profile)
            .child(self.message_header(now))
            .child(resources)
            .child(Element::new("ReleaseList").child(self.release(
                record,
                &sound_reference,
                image_reference.as_deref(),
                release_date,
            )));

        debug!(upc = %record.upc, reference = %sound_reference, "Document tree built");
        Ok(root)
    }

    fn message_header(&self, now: DateTime<Utc>) -> Element {
        Element::new("MessageHeader")
            .text_child("MessageThreadId", self.ids.message_id())
            .text_child("MessageId", self.ids.message_id())
            .child(party(
                "MessageSender",
                &self.profile.sender_party_id,
                &self.profile.sender_name,
            ))
            .child(party(
                "MessageRecipient",
                &self.profile.recipient_party_id,
                &self.profile.recipient_name,
            ))
            .text_child(
                "MessageCreatedDateTime",
                now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            )
            .text_child("MessageControlType", &self.profile.message_control_type)
    }

    fn sound_recording(&self, record: &MetadataRecord, reference: &str) -> Element {
        let year = record
            .published_year
            .unwrap_or(self.profile.fallback_published_year);

        Element::new("SoundRecording")
            .text_child("SoundRecordingType", "MusicalWorkSoundRecording")
            .child(Element::new("SoundRecordingId").text_child("ISRC", &record.isrc))
            .text_child("ResourceReference", reference)
            .child(Element::new("ReferenceTitle").text_child("TitleText", &record.title))
            .text_child("Duration", record.formatted_duration())
            .child(
                Element::new("SoundRecordingDetailsByTerritory")
                    .text_child("TerritoryCode", &self.profile.territory)
                    .child(Element::new("Title").text_child("TitleText", &record.title))
                    .child(display_artist(&record.primary_artists))
                    .child(p_line(year, &record.label))
                    .text_child("ParentalWarningType", &record.parental_advisory),
            )
    }

    fn image(&self, record: &MetadataRecord, file_name: &str, reference: &str) -> Element {
        let proprietary_id = format!("{}_{}", record.upc, IMAGE_DETAILS_REFERENCE);

        Element::new("Image")
            .text_child("ImageType", "FrontCoverImage")
            .child(
                Element::new("ImageId").child(
                    Element::text("ProprietaryId", proprietary_id)
                        .attr("Namespace", &self.profile.sender_party_id),
                ),
            )
            .text_child("ResourceReference", reference)
            .child(
                Element::new("ImageDetailsByTerritory")
                    .text_child("TerritoryCode", &self.profile.territory)
                    .child(
                        Element::new("TechnicalImageDetails")
                            .text_child(
                                "TechnicalResourceDetailsReference",
                                IMAGE_DETAILS_REFERENCE,
                            )
                            .child(Element::new("File").text_child("FileName", file_name)),
                    ),
            )
    }

    fn release(
        &self,
        record: &MetadataRecord,
        sound_reference: &str,
        image_reference: Option<&str>,
        release_date: NaiveDate,
    ) -> Element {
        let date = release_date.format("%Y-%m-%d").to_string();
        let published = record
            .published_year
            .unwrap_or(self.profile.fallback_published_year);
        let copyright = record
            .copyright_year
            .unwrap_or(self.profile.fallback_copyright_year);

        let mut references = Element::new("ReleaseResourceReferenceList")
            .text_child("ReleaseResourceReference", sound_reference);
        if let Some(image) = image_reference {
            references.push(
                Element::text("ReleaseResourceReference", image)
                    .attr("ReleaseResourceType", "SecondaryResource"),
            );
        }

        let mut details = Element::new("ReleaseDetailsByTerritory")
            .text_child("TerritoryCode", &self.profile.territory)
            .text_child("DisplayArtistName", &record.primary_artists)
            .text_child("LabelName", &record.label)
            .child(Element::new("Title").text_child("TitleText", &record.title))
            .child(display_artist(&record.primary_artists))
            .text_child("IsMultiArtistCompilation", "false")
            .text_child("ReleaseType", &self.profile.release_type)
            .text_child("ParentalWarningType", &record.parental_advisory);
        match &record.genre {
            Some(genre) => details.push(Element::new("Genre").text_child("GenreText", genre)),
            None => debug!(upc = %record.upc, "No genre, Genre omitted"),
        }
        details.push(Element::text("ReleaseDate", &date));

        Element::new("Release")
            .attr("IsMainRelease", "true")
            .child(Element::new("ReleaseId").text_child("ICPN", &record.upc))
            .text_child("ReleaseReference", RELEASE_REFERENCE)
            .child(Element::new("ReferenceTitle").text_child("TitleText", &record.title))
            .child(references)
            .child(details)
            .text_child("Duration", record.formatted_duration())
            .child(p_line(published, &record.label))
            .child(
                Element::new("CLine")
                    .text_child("Year", copyright.to_string())
                    .text_child("CLineCompany", &record.label)
                    .text_child("CLineText", format!("© {} {}", copyright, record.label)),
            )
            .text_child("GlobalOriginalReleaseDate", date)
    }
}

fn require(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BuildError::MissingField(field));
    }
    Ok(())
}

fn party(name: &str, party_id: &str, full_name: &str) -> Element {
    Element::new(name)
        .text_child("PartyId", party_id)
        .child(Element::new("PartyName").text_child("FullName", full_name))
}

fn display_artist(artists: &str) -> Element {
    Element::new("DisplayArtist")
        .child(Element::new("PartyName").text_child("FullName", artists))
        .text_child("ArtistRole", ARTIST_ROLE)
}

fn p_line(year: i32, label: &str) -> Element {
    Element::new("PLine")
        .text_child("Year", year.to_string())
        .text_child("PLineCompany", label)
        .text_child("PLineText", format!("℗ {year} {label}"))
}
