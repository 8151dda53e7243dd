use std::fmt::Write;

use crate::mal::{AnimeDetails, RankingEntry, RankingType, SearchResult};

pub fn format_search(results: &SearchResult) -> String {
    if results.entries.is_empty() {
        return "No anime found".to_string();
    }

    let mut out = format!("Found {} anime:\n\n", results.entries.len());
    for (i, anime) in results.entries.iter().enumerate() {
        let _ = writeln!(out, "{}. {} (ID: {})", i + 1, anime.title, anime.id);
        if let Some(en) = &anime.english_title {
            let _ = writeln!(out, "   English: {}", en);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn format_rankings(entries: &[RankingEntry], ranking_type: RankingType) -> String {
    if entries.is_empty() {
        return "No anime rankings found".to_string();
    }

    let mut out = format!(
        "Top {} Anime Rankings ({}):\n\n",
        entries.len(),
        ranking_type
    );
    for entry in entries {
        let _ = writeln!(out, "{}. {} (ID: {})", entry.rank, entry.title, entry.id);
        if let Some(en) = &entry.english_title {
            let _ = writeln!(out, "    English: {}", en);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn format_details(details: &AnimeDetails) -> String {
    let mut lines = vec![format!("Title: {}", details.title)];

    if let Some(synopsis) = &details.synopsis {
        lines.push(format!("Synopsis: {}", synopsis));
    }
    lines.push(match details.episode_count {
        Some(n) => format!("Number of Episodes: {}", n),
        None => "Number of Episodes: Unknown".to_string(),
    });
    lines.push(format!("Status: {}", details.status));
    if let Some(mean) = details.mean_score {
        lines.push(format!("Score: {:.2}", mean));
    }
    if let Some(rank) = details.rank {
        lines.push(format!("Rank: #{}", rank));
    }
    if let Some(popularity) = details.popularity {
        lines.push(format!("Popularity: #{}", popularity));
    }
    if let Some(start) = &details.start_date {
        lines.push(format!("Start Date: {}", start));
    }
    if let Some(end) = &details.end_date {
        lines.push(format!("End Date: {}", end));
    }

    lines.join("\n")
}
