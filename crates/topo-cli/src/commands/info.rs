use super::load_case;
use crate::cli::InfoArgs;
use crate::error::Result;
use topobuilder::core::models::case::Case;

pub fn run(args: InfoArgs) -> Result<()> {
    let case = load_case(&args.case)?;
    for line in summary(&case) {
        println!("{line}");
    }
    Ok(())
}

fn summary(case: &Case) -> Vec<String> {
    let shape = case
        .shape()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("-");

    let mut lines = vec![
        format!("Case:          {}", case.name()),
        format!("Architecture:  {}", case.architecture_signature()),
        format!("Shape:         {shape}"),
        format!("SSEs:          {}", case.sse_count()),
        format!("Motifs:        {}", case.motifs().len()),
        format!("Connectivity:  {}", connectivity_label(case)),
        format!(
            "Placed:        {}",
            if case.is_placed() { "yes" } else { "no" }
        ),
    ];
    if let Some(profile) = case.directionality_profile() {
        lines.push(format!("Direction:     {profile}"));
    }
    if let Some(lengths) = &case.metadata().loop_lengths {
        let lengths = lengths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!("Loop lengths:  {lengths}"));
    }
    if let Some(ss) = case.secondary_structure() {
        lines.push(format!("SS:            {ss}"));
    }
    lines
}

fn connectivity_label(case: &Case) -> String {
    match (case.topology(), case.connectivity_count()) {
        (Some(topology), _) => topology.to_string(),
        (None, 0) => "not fixed".to_string(),
        (None, n) => format!("{n} fixed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topobuilder::engine::placement::place;

    #[test]
    fn relative_case_summary() {
        let case = Case::from_architecture("sandwich", "2H.4E.2H").unwrap();
        let lines = summary(&case);
        assert!(lines.contains(&"Architecture:  2H.4E.2H".to_string()));
        assert!(lines.contains(&"Shape:         2-4-2".to_string()));
        assert!(lines.contains(&"Connectivity:  not fixed".to_string()));
        assert!(lines.contains(&"Placed:        no".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Direction")));
    }

    #[test]
    fn placed_case_reports_direction() {
        let case = place(&Case::from_topology("hairpin", "A1H.A2H").unwrap()).unwrap();
        let lines = summary(&case);
        assert!(lines.contains(&"Connectivity:  1 fixed".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Direction")));
    }
}
