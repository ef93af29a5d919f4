use crate::core::models::case::Case;
use crate::core::statistics::corrections::{CorrectionDocument, CorrectionTable, Corrections};
use crate::engine::config::BuildConfig;
use crate::engine::connectivity;
use crate::engine::correction::apply_corrections;
use crate::engine::error::EngineError;
use crate::engine::loops::{check_linkers, estimate_loop_lengths};
use crate::engine::placement::place;
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// Loads the correction table and documents named by the configuration.
///
/// Nothing configured means nothing to correct beyond what a case embeds.
pub fn load_corrections(config: &BuildConfig) -> Result<Corrections, EngineError> {
    let table = match &config.corrections.table_path {
        Some(path) => {
            let table = CorrectionTable::load(path)?;
            info!(
                "Loaded {} correction(s) from '{}'",
                table.len(),
                path.display()
            );
            table
        }
        None => CorrectionTable::new(),
    };
    let documents = config
        .corrections
        .documents
        .iter()
        .map(|path| {
            let document = CorrectionDocument::load(path)?;
            info!(
                "Loaded correction document '{}' ({} layer(s), {} SSE(s))",
                path.display(),
                document.layers.len(),
                document.sse.len()
            );
            Ok(document)
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(Corrections { documents, table })
}

/// Runs the full pipeline on one case: placement, connectivity, correction and loop estimation.
///
/// A case that fixes its connectivity yields one output per fixed connectivity; otherwise one
/// output per equivalence class of the enumerated connectivities.
///
/// The per-topology stages run on the current rayon pool; callers size it with
/// `ThreadPool::install`. Output order does not depend on the pool.
#[instrument(skip_all, name = "build_workflow", fields(case = %case.name()))]
pub fn run(
    case: &Case,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<Case>, EngineError> {
    // === Phase 0: Preparation ===
    let corrections = reporter.phase("Preparation", || {
        check_linkers(case)
            .map_err(|e| EngineError::from(e).in_stage("preparation", case.name()))?;
        load_corrections(config)
    })?;

    // === Phase 1: Lattice placement ===
    let placed = reporter.phase("Placement", || {
        place(case).map_err(|e| EngineError::from(e).in_stage("placement", case.name()))
    })?;

    // === Phase 2: Connectivities ===
    let topologies = reporter.phase("Connectivity", || {
        let topologies = resolve_connectivities(&placed, config)
            .map_err(|e| e.in_stage("connectivity", case.name()))?;
        reporter.report(Progress::TopologiesResolved {
            case: case.name().to_string(),
            count: topologies.len(),
        });
        Ok::<_, EngineError>(topologies)
    })?;

    // === Phase 3: Corrections and loops ===
    let finished = reporter.phase("Finalization", || {
        reporter.report(Progress::TaskStart {
            total_steps: topologies.len() as u64,
        });
        let finished = topologies
            .par_iter()
            .map(|topology| {
                let result = finalize(topology, &corrections, config);
                reporter.report(Progress::TaskIncrement);
                result
            })
            .collect::<Result<Vec<_>, _>>()?;
        reporter.report(Progress::TaskFinish);
        Ok::<_, EngineError>(finished)
    })?;

    info!("Workflow complete. Returning {} case(s).", finished.len());
    Ok(finished)
}

fn resolve_connectivities(placed: &Case, config: &BuildConfig) -> Result<Vec<Case>, EngineError> {
    if placed.connectivity_count() > 0 {
        if config.enumeration.limit.is_some() {
            warn!(
                "Case '{}' fixes its connectivity; the enumeration limit is ignored",
                placed.name()
            );
        }
        Ok(connectivity::evaluate_fixed(placed)?)
    } else {
        Ok(connectivity::enumerate(placed, &config.enumeration)?)
    }
}

/// Applies corrections and loop estimation to a case that already carries a topology.
pub fn finalize(
    case: &Case,
    corrections: &Corrections,
    config: &BuildConfig,
) -> Result<Case, EngineError> {
    let in_stage = |stage: &'static str| {
        move |e: EngineError| match case.topology() {
            Some(topology) => e.in_topology_stage(stage, case.name(), &topology.to_string()),
            None => e.in_stage(stage, case.name()),
        }
    };
    let corrected = apply_corrections(case, corrections)
        .map_err(EngineError::from)
        .map_err(in_stage("correction"))?;
    let finished = estimate_loop_lengths(&corrected, config.loops.range)
        .map_err(EngineError::from)
        .map_err(in_stage("loops"))?;
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{BuildConfigBuilder, EnumerationConfig};
    use crate::engine::connectivity::equivalence::EquivalenceRelation;
    use crate::engine::connectivity::ConnectivityError;
    use crate::engine::loops::LoopLengthError;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn unwrap_stage(err: EngineError) -> EngineError {
        match err {
            EngineError::Stage { source, .. } | EngineError::TopologyStage { source, .. } => {
                *source
            }
            other => other,
        }
    }

    #[test]
    fn sandwich_builds_end_to_end() {
        let case = Case::from_architecture("sandwich", "2H.4E.2H").unwrap();
        let cases = run(&case, &BuildConfig::default(), &ProgressReporter::new()).unwrap();
        assert!(!cases.is_empty());

        let slots = case.sse_ids();
        for out in &cases {
            let topology = out.topology().unwrap();
            assert!(topology.is_permutation_of(&slots));
            assert_eq!(out.coordinates().len(), 8);
            assert_eq!(out.metadata().loop_lengths.as_ref().unwrap().len(), 7);
            assert_eq!(out.metadata().loop_ranges.as_ref().unwrap().len(), 7);
            assert!(out.metadata().corrections_applied.is_empty());
            assert_eq!(out.architecture_signature(), "2H.4E.2H");
        }
    }

    #[test]
    fn fixed_connectivity_yields_exactly_one_case() {
        let mut case = Case::from_architecture("fixed", "2H.2H").unwrap();
        case.configuration.connectivity = Some("A1H.A2H.B1H.B2H".to_string());
        let cases = run(&case, &BuildConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].topology().unwrap().to_string(), "A1H.A2H.B1H.B2H");
        assert!(cases[0].metadata().equivalent_connectivities.is_none());
    }

    #[test]
    fn topology_string_case_round_trips_through_the_pipeline() {
        let case = Case::from_topology("hairpin", "A1H.A2H").unwrap();
        let cases = run(&case, &BuildConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(cases.len(), 1);
        let helix = "H".repeat(13);
        assert_eq!(
            cases[0].secondary_structure().unwrap(),
            format!("{helix}LLLL{helix}")
        );
    }

    #[test]
    fn enumeration_limit_caps_the_output() {
        let case = Case::from_architecture("capped", "2H.2H").unwrap();
        let config = BuildConfig {
            enumeration: EnumerationConfig {
                equivalence: EquivalenceRelation::Exact,
                limit: Some(5),
            },
            ..BuildConfig::default()
        };
        let cases = run(&case, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(cases.len(), 5);
    }

    #[test]
    fn linker_mismatch_is_rejected_during_preparation() {
        let mut case = Case::from_architecture("linkers", "2H").unwrap();
        case.configuration.connectivity = Some("A1H.A2H".to_string());
        case.configuration.l_linkers = Some(vec![3, 3]);
        let err = run(&case, &BuildConfig::default(), &ProgressReporter::new()).unwrap_err();
        assert!(err.to_string().contains("Stage 'preparation'"), "{err}");
        assert!(matches!(
            unwrap_stage(err),
            EngineError::LoopLength {
                source: LoopLengthError::LinkerCountMismatch { expected: 1, found: 2, .. }
            }
        ));
    }

    #[test]
    fn linker_mismatch_stops_before_enumeration() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let mut case = Case::from_architecture("wide", "3H.3H").unwrap();
        case.configuration.l_linkers = Some(vec![2, 2]);
        let err = run(&case, &BuildConfig::default(), &reporter).unwrap_err();
        drop(reporter);

        assert!(matches!(
            unwrap_stage(err),
            EngineError::LoopLength {
                source: LoopLengthError::LinkerCountMismatch { expected: 5, found: 2, .. }
            }
        ));
        assert_eq!(phases.into_inner().unwrap(), ["Preparation"]);
    }

    #[test]
    fn finalization_errors_name_the_case_and_the_topology() {
        let placed = place(&Case::from_architecture("hairpin", "2H").unwrap()).unwrap();
        let mut case = connectivity::evaluate(&placed, "A1H.A2H").unwrap();
        case.configuration.l_linkers = Some(vec![3, 3]);

        let err = finalize(&case, &Corrections::new(), &BuildConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("case 'hairpin'"), "{message}");
        assert!(message.contains("topology A1H.A2H"), "{message}");
        match err {
            EngineError::TopologyStage { stage, case, topology, .. } => {
                assert_eq!(stage, "loops");
                assert_eq!(case, "hairpin");
                assert_eq!(topology, "A1H.A2H");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreachable_architecture_fails_the_connectivity_stage() {
        let mut case = Case::from_architecture("apart", "1H.1H").unwrap();
        case.configuration.link_dist = 5.0;
        let err = run(&case, &BuildConfig::default(), &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            unwrap_stage(err),
            EngineError::Connectivity {
                source: ConnectivityError::NoValidConnectivity { .. }
            }
        ));
    }

    #[test]
    fn correction_table_is_loaded_and_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrections.csv");
        fs::write(
            &path,
            "type_i,type_j,layer_offset,position_offset,dx,dy,dz,tx,ty,tz\nH,H,0,1,0.5,0,0,0,0,10\n",
        )
        .unwrap();
        let config = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Exact)
            .loop_range(3)
            .correction_table_path(Some(path))
            .build()
            .unwrap();

        let mut case = Case::from_architecture("corrected", "2H").unwrap();
        case.configuration.connectivity = Some("A1H.A2H".to_string());
        let cases = run(&case, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(cases[0].metadata().corrections_applied, ["HH[+0,+1]"]);
        let a2 = cases[0].placed(&"A2H".parse().unwrap()).unwrap();
        assert_eq!(a2.center[0], 5.5);
        assert_eq!(a2.tilt.z, 10.0);
    }

    #[test]
    fn correction_documents_and_embedded_corrections_are_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layers.toml");
        fs::write(&path, "[layers.A]\nzcurve = 2.0\n").unwrap();
        let config = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Exact)
            .loop_range(3)
            .correction_documents(vec![path])
            .build()
            .unwrap();

        let mut case = Case::from_architecture("bent", "3H").unwrap();
        case.configuration.connectivity = Some("A1H.A2H.A3H".to_string());
        let mut embedded = CorrectionDocument::default();
        embedded.sse.insert("A3H".parse().unwrap(), Default::default());
        case.metadata.corrections = vec![embedded];

        let cases = run(&case, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(
            cases[0].metadata().corrections_applied,
            ["layer A", "sse A3H"]
        );
        let a2 = cases[0].placed(&"A2H".parse().unwrap()).unwrap();
        assert!((a2.center[2] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_correction_table_is_reported() {
        let dir = tempdir().unwrap();
        let config = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Exact)
            .loop_range(3)
            .correction_table_path(Some(dir.path().join("absent.csv")))
            .build()
            .unwrap();
        let case = Case::from_architecture("nofile", "2H").unwrap();
        let err = run(&case, &config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::CorrectionTable { .. }));
    }

    #[test]
    fn caller_pool_does_not_change_the_output() {
        let case = Case::from_architecture("pooled", "2H.2H").unwrap();
        let config = BuildConfig {
            enumeration: EnumerationConfig {
                equivalence: EquivalenceRelation::Exact,
                limit: None,
            },
            ..BuildConfig::default()
        };
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| run(&case, &config, &ProgressReporter::new()))
            .unwrap();
        let wide = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| run(&case, &config, &ProgressReporter::new()))
            .unwrap();
        assert_eq!(single.len(), 24);
        assert_eq!(single, wide);
    }

    #[test]
    fn phases_are_reported_in_order() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let case = Case::from_architecture("phases", "2H").unwrap();
        run(&case, &BuildConfig::default(), &reporter).unwrap();
        drop(reporter);
        assert_eq!(
            phases.into_inner().unwrap(),
            ["Preparation", "Placement", "Connectivity", "Finalization"]
        );
    }
}
