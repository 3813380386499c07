//! Per-user analysis session
//!
//! Tracks the currently selected image and its latest result. Analyses run
//! asynchronously, so a result may arrive after the user has moved on; every
//! request carries a [`Ticket`] and outcomes for an outdated ticket are
//! discarded instead of overwriting newer state.

use serde::Serialize;

use crate::analysis::{AnalysisState, FlightHeightResult};
use crate::error::{Error, Result};
use crate::gsd::{GsdReference, RasterMetadata, RasterResolution};
use crate::metadata::MetadataRecord;
use crate::types::ImageId;

/// Identifies one image selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket {
    pub image_id: ImageId,
    /// Increases with every selection, so re-selecting an image also
    /// invalidates older requests for it
    pub generation: u64,
    /// Number of results accepted for this selection when the request was
    /// made; an outcome built on an older result is stale
    pub revision: u64,
}

/// Ways to replace a computed height
#[derive(Debug, Clone, PartialEq)]
pub enum Recalculation {
    /// Measure the map GSD from raster metadata
    Raster {
        raster: RasterMetadata,
        reference: GsdReference,
    },
    /// Use an already known map GSD
    Resolution {
        resolution: RasterResolution,
        reference: GsdReference,
    },
    /// Use a user-entered height
    Manual { height_m: f64 },
}

/// Inputs consumed by the analysis state machine
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    /// An image was selected and needs a fresh analysis
    ImageSelected(MetadataRecord),
    /// The user asked to replace the current result
    RecalculationRequested {
        current: FlightHeightResult,
        recalculation: Recalculation,
    },
}

/// Finished work for one ticket
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub ticket: Ticket,
    pub result: Result<FlightHeightResult>,
}

/// What [`Session::accept`] did with an outcome
#[derive(Debug)]
pub enum Accepted {
    /// Outcome became the current result
    Current,
    /// Outcome belongs to an earlier selection, or was built on a result
    /// that has since been replaced, and was dropped
    Stale,
    /// Work failed; the previous result is unchanged
    Rejected(Error),
}

/// Selection and result state of one user
#[derive(Debug, Default)]
pub struct Session {
    ticket: Option<Ticket>,
    result: Option<FlightHeightResult>,
    next_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects an image and returns the event that starts its analysis
    pub fn select(&mut self, record: MetadataRecord) -> (Ticket, AnalysisEvent) {
        let ticket = self.select_image(record.image_id());
        (ticket, AnalysisEvent::ImageSelected(record))
    }

    /// Makes `image_id` current and clears the previous result
    pub fn select_image(&mut self, image_id: ImageId) -> Ticket {
        self.next_generation += 1;
        let ticket = Ticket {
            image_id,
            generation: self.next_generation,
            revision: 0,
        };
        tracing::debug!(image = %ticket.image_id, generation = ticket.generation, "image selected");
        self.ticket = Some(ticket.clone());
        self.result = None;
        ticket
    }

    /// Builds a recalculation event for the current result
    pub fn recalculate(&self, recalculation: Recalculation) -> Result<(Ticket, AnalysisEvent)> {
        let (ticket, current) = match (&self.ticket, &self.result) {
            (Some(ticket), Some(current)) => (ticket.clone(), current.clone()),
            _ => {
                return Err(Error::InvalidTransition(
                    "no analyzed image to recalculate".to_string(),
                ))
            }
        };
        if !current.state().can_recalculate() {
            return Err(Error::InvalidTransition(format!(
                "cannot recalculate '{}' from state {}",
                current.image_id(),
                current.state()
            )));
        }
        Ok((ticket, AnalysisEvent::RecalculationRequested { current, recalculation }))
    }

    /// Applies an outcome if it belongs to the current selection and was
    /// built on the current result
    pub fn accept(&mut self, outcome: AnalysisOutcome) -> Accepted {
        if self.ticket.as_ref() != Some(&outcome.ticket) {
            tracing::debug!(
                image = %outcome.ticket.image_id,
                generation = outcome.ticket.generation,
                revision = outcome.ticket.revision,
                "discarding stale analysis outcome"
            );
            return Accepted::Stale;
        }
        match outcome.result {
            Ok(result) => {
                self.result = Some(result);
                if let Some(ticket) = self.ticket.as_mut() {
                    ticket.revision += 1;
                }
                Accepted::Current
            }
            Err(e) => {
                tracing::warn!(image = %outcome.ticket.image_id, error = %e, "analysis rejected");
                Accepted::Rejected(e)
            }
        }
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub fn current_image(&self) -> Option<&ImageId> {
        self.ticket.as_ref().map(|t| &t.image_id)
    }

    pub fn result(&self) -> Option<&FlightHeightResult> {
        self.result.as_ref()
    }

    /// State of the current image, `Unanalyzed` while work is pending
    pub fn state(&self) -> Option<AnalysisState> {
        match (&self.ticket, &self.result) {
            (None, _) => None,
            (Some(_), None) => Some(AnalysisState::Unanalyzed),
            (Some(_), Some(result)) => Some(result.state()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::{ElevationSample, TerrainEstimate};
    use crate::analysis::{FlightHeightAnalyzer, HeightPolicy};
    use crate::elevation::TerrainAggregator;
    use crate::types::Coordinate;

    fn result_for(image: &str, terrain_m: f64, altitude: f64) -> FlightHeightResult {
        let coord = Coordinate::new(46.0, 7.0).unwrap();
        let terrain = TerrainEstimate::from_samples(coord, vec![ElevationSample::success(coord, "a", terrain_m)]);
        FlightHeightAnalyzer::new(TerrainAggregator::new(Vec::new()), HeightPolicy::default())
            .evaluate(image.into(), altitude, terrain)
    }

    #[test]
    fn test_select_is_unanalyzed() {
        let mut session = Session::new();
        assert_eq!(session.state(), None);
        session.select_image("a.jpg".into());
        assert_eq!(session.state(), Some(AnalysisState::Unanalyzed));
        assert_eq!(session.current_image().unwrap().as_str(), "a.jpg");
    }

    #[test]
    fn test_stale_outcome_discarded() {
        let mut session = Session::new();
        let ticket_a = session.select_image("a.jpg".into());
        let ticket_b = session.select_image("b.jpg".into());

        let stale = session.accept(AnalysisOutcome {
            ticket: ticket_a,
            result: Ok(result_for("a.jpg", 100.0, 150.0)),
        });
        assert!(matches!(stale, Accepted::Stale));
        assert!(session.result().is_none());

        let current = session.accept(AnalysisOutcome {
            ticket: ticket_b,
            result: Ok(result_for("b.jpg", 100.0, 160.0)),
        });
        assert!(matches!(current, Accepted::Current));
        assert_eq!(session.result().unwrap().image_id().as_str(), "b.jpg");
    }

    #[test]
    fn test_reselecting_same_image_invalidates_old_ticket() {
        let mut session = Session::new();
        let first = session.select_image("a.jpg".into());
        session.select_image("b.jpg".into());
        session.select_image("a.jpg".into());

        let outcome = session.accept(AnalysisOutcome {
            ticket: first,
            result: Ok(result_for("a.jpg", 0.0, 10.0)),
        });
        assert!(matches!(outcome, Accepted::Stale));
    }

    #[test]
    fn test_rejected_keeps_previous_result() {
        let mut session = Session::new();
        let ticket = session.select_image("a.jpg".into());
        session.accept(AnalysisOutcome {
            ticket,
            result: Ok(result_for("a.jpg", 150.0, 100.0)),
        });

        let (ticket, _) = session.recalculate(Recalculation::Manual { height_m: 40.0 }).unwrap();
        let outcome = session.accept(AnalysisOutcome {
            ticket,
            result: Err(Error::InvalidRasterInput("zero pixel size".to_string())),
        });
        assert!(matches!(outcome, Accepted::Rejected(Error::InvalidRasterInput(_))));
        assert_eq!(session.state(), Some(AnalysisState::Flagged));
    }

    #[test]
    fn test_concurrent_recalculations_keep_audit_trail() {
        let analyzer = FlightHeightAnalyzer::new(TerrainAggregator::new(Vec::new()), HeightPolicy::default());
        let mut session = Session::new();
        let ticket = session.select_image("a.jpg".into());
        session.accept(AnalysisOutcome {
            ticket,
            result: Ok(result_for("a.jpg", 150.0, 100.0)),
        });
        let flagged = session.result().cloned().unwrap();

        // Both requests start from the flagged result
        let reference = crate::gsd::preset("DJI Phantom 4 Pro").unwrap().reference();
        let resolution = RasterResolution::new(2.72).unwrap();
        let (gsd_ticket, _) = session
            .recalculate(Recalculation::Resolution { resolution, reference: reference.clone() })
            .unwrap();
        let (manual_ticket, _) = session.recalculate(Recalculation::Manual { height_m: 45.0 }).unwrap();

        let gsd = analyzer.recalculate_with_resolution(&flagged, resolution, &reference);
        let manual = analyzer.override_height(&flagged, 45.0);

        assert!(matches!(
            session.accept(AnalysisOutcome { ticket: gsd_ticket, result: gsd }),
            Accepted::Current
        ));
        assert!(matches!(
            session.accept(AnalysisOutcome { ticket: manual_ticket, result: manual }),
            Accepted::Stale
        ));

        let current = session.result().unwrap();
        assert!((current.effective_height_m().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(current.previous(), Some(&flagged));

        // Retrying on top of the accepted result keeps every step
        let (ticket, _) = session.recalculate(Recalculation::Manual { height_m: 45.0 }).unwrap();
        let manual = analyzer.override_height(current, 45.0);
        assert!(matches!(
            session.accept(AnalysisOutcome { ticket, result: manual }),
            Accepted::Current
        ));
        let trail: Vec<Option<f64>> = session
            .result()
            .unwrap()
            .audit_trail()
            .map(|r| r.effective_height_m())
            .collect();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0], Some(45.0));
        assert_eq!(trail[2], Some(-50.0));
    }

    #[test]
    fn test_recalculate_requires_result() {
        let mut session = Session::new();
        session.select_image("a.jpg".into());
        let event = session.recalculate(Recalculation::Manual { height_m: 40.0 });
        assert!(matches!(event, Err(Error::InvalidTransition(_))));

        let ticket = session.ticket().cloned().unwrap();
        session.accept(AnalysisOutcome {
            ticket,
            result: Ok(result_for("a.jpg", 150.0, 100.0)),
        });
        let (event_ticket, event) = session.recalculate(Recalculation::Manual { height_m: 40.0 }).unwrap();
        assert_eq!(Some(&event_ticket), session.ticket());
        assert_eq!(event_ticket.revision, 1);
        assert!(matches!(event, AnalysisEvent::RecalculationRequested { .. }));
    }
}
