//! Find-or-create-or-update of cards and printings by natural key.
//!
//! Re-importing an unchanged record must be a no-op: entities are only marked
//! modified, and only counted as updated, when at least one field actually
//! differs from what is stored.

use crate::database::{CardHandle, UnitOfWork};
use crate::models::{Card, CardPrinting, CardRecord, Change, PrintingMatch, UpsertOutcome};

/// Upsert the card and printing described by `record`.
pub async fn upsert_record(
    uow: &mut UnitOfWork,
    record: &CardRecord,
    matching: PrintingMatch,
) -> Result<UpsertOutcome, sqlx::Error> {
    let (card, card_change) = upsert_card(uow, record).await?;
    let printing_change = upsert_printing(uow, card, record, matching).await?;

    Ok(UpsertOutcome {
        card: card_change,
        printing: printing_change,
    })
}

async fn upsert_card(
    uow: &mut UnitOfWork,
    record: &CardRecord,
) -> Result<(CardHandle, Change), sqlx::Error> {
    let Some(handle) = uow.find_card(&record.game, &record.name).await? else {
        let handle = uow.add_card(Card {
            id: None,
            game: record.game.clone(),
            name: record.name.clone(),
            card_type: record.card_type.clone(),
            description: record.description.clone(),
            details_json: record.card_details.clone(),
        });
        return Ok((handle, Change::Created));
    };

    let existing = uow.card(handle);
    let differs = existing.card_type != record.card_type
        || existing.description != record.description
        || existing.details_json != record.card_details;
    if !differs {
        return Ok((handle, Change::Unchanged));
    }

    let card = uow.card_mut(handle);
    card.card_type.clone_from(&record.card_type);
    card.description.clone_from(&record.description);
    card.details_json.clone_from(&record.card_details);
    Ok((handle, Change::Updated))
}

async fn upsert_printing(
    uow: &mut UnitOfWork,
    card: CardHandle,
    record: &CardRecord,
    matching: PrintingMatch,
) -> Result<Change, sqlx::Error> {
    let style = record.style.as_str();
    let key_style = match matching {
        PrintingMatch::SetAndNumber => None,
        PrintingMatch::SetNumberAndStyle => Some(style),
    };

    let Some(handle) = uow
        .find_printing(card, &record.set_code, &record.number, key_style)
        .await?
    else {
        let card_id = uow.card(card).id;
        uow.add_printing(
            card,
            CardPrinting {
                id: None,
                card_id,
                set_code: record.set_code.clone(),
                number: record.number.clone(),
                rarity: record.rarity.clone(),
                style: style.to_string(),
                image_url: record.image_url.clone(),
                details_json: record.printing_details.clone(),
            },
        );
        return Ok(Change::Created);
    };

    let existing = uow.printing(handle);
    // A missing image never clears a stored one.
    let image_url = record
        .image_url
        .clone()
        .or_else(|| existing.image_url.clone());
    let differs = existing.rarity != record.rarity
        || existing.style != style
        || existing.image_url != image_url
        || existing.details_json != record.printing_details;
    if !differs {
        return Ok(Change::Unchanged);
    }

    let printing = uow.printing_mut(handle);
    printing.rarity.clone_from(&record.rarity);
    printing.style = style.to_string();
    printing.image_url = image_url;
    printing.details_json.clone_from(&record.printing_details);
    Ok(Change::Updated)
}
