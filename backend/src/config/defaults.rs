//! Built-in configuration written by `init-config` and used when no
//! configuration directory exists.

use serde_json::{json, Value};

pub fn field_mappings() -> Value {
    json!({
        "life": {
            "applicant_first_name": "insured_first_name",
            "applicant_last_name": "insured_last_name",
            "applicant_birth_date": "insured_birth_date",
            "applicant_gender": {
                "target_field": "insured_gender",
                "value_mapping": {
                    "M": "Male",
                    "F": "Female",
                    "Male": "Male",
                    "Female": "Female"
                }
            },
            "policy_face_amount": {
                "target_field": "coverage_amount",
                "data_type": "float"
            },
            "policy_effective_date": "policy_start_date",
            "premium_mode": {
                "target_field": "premium_frequency",
                "value_mapping": {
                    "A": "Annual",
                    "SA": "Semi-Annual",
                    "Q": "Quarterly",
                    "M": "Monthly"
                }
            },
            "risk_class": "risk_class",
            "state_issued": "state_issued"
        },
        "annuity": {
            "annuitant_first_name": "annuitant_first_name",
            "annuitant_last_name": "annuitant_last_name",
            "annuitant_birth_date": "annuitant_birth_date",
            "initial_premium": {
                "target_field": "premium_amount",
                "data_type": "float"
            },
            "annuity_start_date": "contract_start_date"
        },
        "health": {
            "member_first_name": "member_first_name",
            "member_last_name": "member_last_name",
            "member_birth_date": "member_birth_date",
            "plan_type": "coverage_type",
            "deductible_amount": {
                "target_field": "deductible",
                "data_type": "float"
            }
        }
    })
}

pub fn validation_rules() -> Value {
    json!({
        "base": {
            "basic": {
                "required_fields": [
                    "applicant_first_name",
                    "applicant_last_name",
                    "applicant_birth_date"
                ],
                "field_types": {
                    "applicant_first_name": "string",
                    "applicant_last_name": "string",
                    "applicant_birth_date": "date",
                    "policy_face_amount": "number",
                    "premium_amount": "number"
                },
                "field_ranges": {
                    "policy_face_amount": { "min": 1000, "max": 10000000 },
                    "premium_amount": { "min": 10, "max": 100000 }
                },
                "field_formats": {
                    "applicant_birth_date": { "date_format": "%Y-%m-%d" }
                }
            },
            "business": {
                "age_validations": {
                    "min_age": 18,
                    "max_age": 85,
                    "warning_age": 65,
                    "birth_date_field": "applicant_birth_date"
                },
                "coverage_validations": {
                    "min_amount": 1000,
                    "max_amount": 5000000,
                    "amount_field": "policy_face_amount"
                }
            },
            "strict": {
                "field_dependencies": [
                    {
                        "source_field": "beneficiary_name",
                        "dependent_field": "beneficiary_relationship",
                        "condition": "required_if_present"
                    }
                ],
                "consistency_checks": [
                    {
                        "type": "date_order",
                        "earlier_field": "applicant_birth_date",
                        "later_field": "policy_effective_date"
                    }
                ]
            }
        },
        "life": {
            "business": {
                "age_validations": { "min_age": 18, "max_age": 80 },
                "coverage_validations": { "min_amount": 10000, "max_amount": 10000000 }
            }
        },
        "annuity": {
            "basic": {
                "required_fields": [
                    "annuitant_first_name",
                    "annuitant_last_name",
                    "annuitant_birth_date"
                ]
            },
            "business": {
                "age_validations": {
                    "min_age": 18,
                    "max_age": 85,
                    "birth_date_field": "annuitant_birth_date"
                },
                "coverage_validations": {
                    "min_amount": 0,
                    "amount_field": "initial_premium"
                }
            },
            "strict": {
                "consistency_checks": [
                    {
                        "type": "date_order",
                        "earlier_field": "annuitant_birth_date",
                        "later_field": "annuity_start_date"
                    }
                ]
            }
        },
        "health": {
            "basic": {
                "required_fields": [
                    "member_first_name",
                    "member_last_name",
                    "member_birth_date"
                ]
            },
            "business": {
                "age_validations": {
                    "min_age": 0,
                    "max_age": 120,
                    "warning_age": 65,
                    "birth_date_field": "member_birth_date"
                },
                "coverage_validations": {
                    "min_amount": 0,
                    "amount_field": "deductible_amount"
                }
            }
        }
    })
}

pub fn transformations() -> Value {
    json!({
        "life": [
            {
                "type": "currency_conversion",
                "field": "coverage_amount",
                "from_currency": "USD",
                "to_currency": "USD"
            },
            {
                "type": "age",
                "field": "applicant_age",
                "birth_date_field": "insured_birth_date",
                "effective_date_field": "policy_start_date"
            },
            {
                "type": "policy_year",
                "field": "policy_year",
                "effective_date_field": "policy_start_date"
            },
            {
                "type": "annual_premium",
                "field": "annual_premium",
                "face_amount_field": "coverage_amount",
                "age_field": "applicant_age",
                "risk_class_field": "risk_class",
                "state_field": "state_issued"
            },
            {
                "type": "modal_premium",
                "field": "modal_premium",
                "annual_premium_field": "annual_premium",
                "frequency_field": "premium_frequency"
            }
        ],
        "annuity": [
            {
                "type": "currency_conversion",
                "field": "premium_amount",
                "from_currency": "USD",
                "to_currency": "USD"
            },
            {
                "type": "age",
                "field": "annuitant_age",
                "birth_date_field": "annuitant_birth_date",
                "effective_date_field": "contract_start_date"
            },
            {
                "type": "policy_year",
                "field": "contract_year",
                "effective_date_field": "contract_start_date"
            },
            {
                "type": "account_value",
                "field": "account_value",
                "initial_premium_field": "premium_amount",
                "policy_year_field": "contract_year"
            }
        ]
    })
}

pub fn output_templates() -> Value {
    json!({
        "life": {
            "insured_info": {
                "fields": [
                    "insured_first_name",
                    "insured_last_name",
                    "insured_birth_date",
                    "insured_gender",
                    "applicant_age"
                ],
                "defaults": { "insured_gender": "Unknown" }
            },
            "policy_info": {
                "fields": [
                    "coverage_amount",
                    "policy_start_date",
                    "premium_frequency",
                    "policy_year"
                ],
                "defaults": { "premium_frequency": "Monthly" }
            },
            "calculation_inputs": {
                "fields": [
                    "coverage_amount",
                    "insured_birth_date",
                    "premium_frequency",
                    "risk_class",
                    "state_issued",
                    "annual_premium",
                    "modal_premium"
                ]
            }
        },
        "annuity": {
            "annuitant_info": {
                "fields": [
                    "annuitant_first_name",
                    "annuitant_last_name",
                    "annuitant_birth_date",
                    "annuitant_age"
                ]
            },
            "contract_info": {
                "fields": [
                    "premium_amount",
                    "contract_start_date",
                    "contract_year",
                    "account_value"
                ]
            }
        },
        "health": {
            "member_info": {
                "fields": ["member_first_name", "member_last_name", "member_birth_date"]
            },
            "coverage_info": {
                "fields": ["coverage_type", "deductible"],
                "defaults": { "deductible": 0 }
            }
        }
    })
}
